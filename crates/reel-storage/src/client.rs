//! R2 client implementation.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use reel_models::AssetUrl;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::keys::object_key;
use crate::store::ObjectStore;

/// Longest lifetime the S3 API accepts for a presigned GET.
const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 3600);

/// Configuration for R2 client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL objects are served from (custom domain or r2.dev)
    pub public_url: Option<String>,
    /// Key prefix for every uploaded object
    pub key_prefix: String,
}

impl R2Config {
    /// Create config from environment variables.
    ///
    /// `R2_ENDPOINT_URL` wins over the endpoint derived from `R2_ACCOUNT_ID`.
    pub fn from_env() -> StorageResult<Self> {
        let endpoint_url = match std::env::var("R2_ENDPOINT_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                let account_id = std::env::var("R2_ACCOUNT_ID").map_err(|_| {
                    StorageError::config_error("R2_ENDPOINT_URL or R2_ACCOUNT_ID not set")
                })?;
                format!("https://{}.r2.cloudflarestorage.com", account_id.trim())
            }
        };

        Ok(Self {
            endpoint_url,
            access_key_id: std::env::var("R2_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("R2_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("R2_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("R2_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("R2_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("R2_BUCKET_NAME not set"))?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_url: std::env::var("R2_PUBLIC_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            key_prefix: std::env::var("R2_KEY_PREFIX").unwrap_or_else(|_| "reel".to_string()),
        })
    }

    /// Public base URL normalised to `https://host/` form.
    pub fn public_base(&self) -> Option<String> {
        let raw = self.public_url.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };
        Some(if with_scheme.ends_with('/') {
            with_scheme
        } else {
            format!("{}/", with_scheme)
        })
    }
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_base: Option<String>,
    key_prefix: String,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub fn new(config: R2Config) -> Self {
        let public_base = config.public_base();

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base,
            key_prefix: config.key_prefix,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    /// Upload bytes to R2.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {}", key);
        Ok(())
    }

    /// Download object as bytes.
    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Generate a presigned URL for GET (temporary, signed URL via S3 API).
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in.min(MAX_PRESIGN_EXPIRY))
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// URL a remote provider can fetch the object from.
    ///
    /// Uses the public base URL when configured, otherwise a presigned GET
    /// valid for the maximum lifetime.
    pub async fn object_url(&self, key: &str) -> StorageResult<AssetUrl> {
        let raw = match &self.public_base {
            Some(base) => public_object_url(base, key),
            None => self.presign_get(key, MAX_PRESIGN_EXPIRY).await?,
        };
        AssetUrl::parse_remote(&raw).map_err(|e| StorageError::invalid_url(e.to_string()))
    }

    /// Check connectivity to R2 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }

    /// Delete an object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    fn name(&self) -> &str {
        "r2"
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<AssetUrl> {
        let key = object_key(&self.key_prefix, file_name)?;
        self.upload_bytes(data, &key, content_type).await?;
        self.object_url(&key).await
    }
}

/// Join a normalised public base and an object key, escaping each segment.
fn public_object_url(base: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}{}", base, encoded.join("/"))
}
