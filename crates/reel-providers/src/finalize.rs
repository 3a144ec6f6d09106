//! Finalization of provider content delivered as raw bytes.
//!
//! Some providers hand back content that must be downloaded rather than a
//! hosted URL. The bytes are persisted to durable storage when configured;
//! otherwise (or when the upload fails) they are kept in the process-local
//! blob cache and a warning is reported. Neither case fails the scene.

use std::sync::Arc;

use reel_models::AssetUrl;
use reel_storage::{LocalBlobCache, ObjectStore};
use tracing::{info, warn};

use crate::error::ProviderResult;
use crate::poller::JobContext;

#[derive(Clone)]
pub struct AssetFinalizer {
    store: Option<Arc<dyn ObjectStore>>,
    cache: LocalBlobCache,
}

impl AssetFinalizer {
    pub fn new(store: Option<Arc<dyn ObjectStore>>, cache: LocalBlobCache) -> Self {
        Self { store, cache }
    }

    /// Finalizer that only ever produces local references.
    pub fn local_only(cache: LocalBlobCache) -> Self {
        Self::new(None, cache)
    }

    pub fn has_durable_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn cache(&self) -> &LocalBlobCache {
        &self.cache
    }

    /// Persist `data` and return a URL for it.
    ///
    /// The URL is remote when durable storage accepted the upload and a
    /// `blob:` reference otherwise.
    pub async fn finalize(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
        ctx: &JobContext,
    ) -> ProviderResult<AssetUrl> {
        ctx.ensure_active()?;

        let Some(store) = &self.store else {
            ctx.progress
                .warning("No durable storage configured; keeping asset in local cache");
            return Ok(self.cache.insert(data, content_type).await?);
        };

        // The upload consumes the bytes; keep a copy for the fallback path.
        match store.upload(data.clone(), file_name, content_type).await {
            Ok(url) => {
                info!(store = %store.name(), "Persisted {} as {}", file_name, url);
                Ok(url)
            }
            Err(e) => {
                warn!(store = %store.name(), "Upload of {} failed: {}", file_name, e);
                ctx.progress.warning(format!(
                    "Upload to {} failed ({}); keeping asset in local cache",
                    store.name(),
                    e
                ));
                Ok(self.cache.insert(data, content_type).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reel_storage::{StorageError, StorageResult};

    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        fn name(&self) -> &str {
            "failing"
        }

        async fn upload(&self, _data: Vec<u8>, _file_name: &str, _content_type: &str) -> StorageResult<AssetUrl> {
            Err(StorageError::upload_failed("bucket missing"))
        }
    }

    struct FixedStore;

    #[async_trait]
    impl ObjectStore for FixedStore {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn upload(&self, _data: Vec<u8>, file_name: &str, _content_type: &str) -> StorageResult<AssetUrl> {
            Ok(AssetUrl::parse(&format!("https://media.example/{}", file_name)).unwrap())
        }
    }

    #[tokio::test]
    async fn test_durable_upload() {
        let finalizer = AssetFinalizer::new(Some(Arc::new(FixedStore)), LocalBlobCache::new());
        let url = finalizer
            .finalize(vec![1], "scene.mp4", "video/mp4", &JobContext::default())
            .await
            .unwrap();
        assert_eq!(url.as_str(), "https://media.example/scene.mp4");
        assert!(finalizer.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_failure_falls_back_with_warning() {
        let ctx = JobContext::default();
        let mut rx = ctx.progress.subscribe();
        let finalizer = AssetFinalizer::new(Some(Arc::new(FailingStore)), LocalBlobCache::new());

        let url = finalizer.finalize(vec![1, 2], "scene.mp4", "video/mp4", &ctx).await.unwrap();

        assert!(url.is_local());
        assert_eq!(finalizer.cache().get(url.as_str()).await.unwrap().data.len(), 2);
        let event = rx.recv().await.unwrap();
        assert!(event.is_warning());
        assert!(event.message().unwrap().contains("bucket missing"));
    }

    #[tokio::test]
    async fn test_no_store_uses_cache() {
        let finalizer = AssetFinalizer::local_only(LocalBlobCache::new());
        assert!(!finalizer.has_durable_store());
        let url = finalizer
            .finalize(vec![9], "scene.mp4", "video/mp4", &JobContext::default())
            .await
            .unwrap();
        assert!(url.is_local());
    }
}
