//! Process-local blob cache.
//!
//! When durable storage is not configured or an upload fails, fetched media is
//! kept in memory and referenced through a `blob:reel/<uuid>` URL. These
//! references are only meaningful inside the current process and are lost on
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use reel_models::AssetUrl;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

const BLOB_PREFIX: &str = "blob:reel/";

/// A cached blob.
#[derive(Debug, Clone)]
pub struct LocalBlob {
    pub data: Arc<Vec<u8>>,
    pub content_type: String,
}

/// In-memory store of blobs keyed by local reference.
#[derive(Debug, Clone, Default)]
pub struct LocalBlobCache {
    blobs: Arc<RwLock<HashMap<String, LocalBlob>>>,
}

impl LocalBlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob and return its local reference.
    pub async fn insert(&self, data: Vec<u8>, content_type: &str) -> StorageResult<AssetUrl> {
        let id = Uuid::new_v4().to_string();
        let reference = format!("{}{}", BLOB_PREFIX, id);
        let url =
            AssetUrl::parse(&reference).map_err(|e| StorageError::invalid_url(e.to_string()))?;
        debug!("Caching {} bytes locally as {}", data.len(), reference);

        self.blobs.write().await.insert(
            id,
            LocalBlob {
                data: Arc::new(data),
                content_type: content_type.to_string(),
            },
        );

        Ok(url)
    }

    /// Look up a blob by its local reference.
    pub async fn get(&self, reference: &str) -> Option<LocalBlob> {
        let id = reference.strip_prefix(BLOB_PREFIX)?;
        self.blobs.read().await.get(id).cloned()
    }

    /// Drop a blob, returning whether it existed.
    pub async fn remove(&self, reference: &str) -> bool {
        match reference.strip_prefix(BLOB_PREFIX) {
            Some(id) => self.blobs.write().await.remove(id).is_some(),
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}
