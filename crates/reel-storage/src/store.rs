//! Object store abstraction.

use async_trait::async_trait;
use reel_models::AssetUrl;

use crate::error::StorageResult;

/// Durable storage that turns bytes into a URL remote providers can fetch.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name used in logs and warnings.
    fn name(&self) -> &str;

    /// Persist `data` under `file_name` and return its absolute http(s) URL.
    async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<AssetUrl>;
}
