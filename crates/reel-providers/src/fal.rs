//! fal.ai FFmpeg queue (stitching, audio/video mixing) and file storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reel_models::{AssetUrl, SceneUpdate};
use reel_storage::{ObjectStore, StorageError, StorageResult};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::adapter::{AudioVideoMixer, GeneratedAsset, VideoStitcher};
use crate::credentials::{CredentialKey, CredentialProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::extract::{self, first_match};
use crate::http;
use crate::poller::{AsyncJobPoller, JobContext, PollPolicy, PollStatus, Submission};

const PROVIDER: &str = "fal";

/// Configuration for the fal.ai clients.
#[derive(Debug, Clone)]
pub struct FalConfig {
    pub queue_url: String,
    pub storage_url: String,
    /// Queue application hosting the FFmpeg operations
    pub app: String,
    pub timeout: Duration,
    pub poll: PollPolicy,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            queue_url: "https://queue.fal.run".to_string(),
            storage_url: "https://fal.run".to_string(),
            app: "fal-ai/ffmpeg-api".to_string(),
            timeout: Duration::from_secs(120),
            poll: PollPolicy::STITCHING,
        }
    }
}

impl FalConfig {
    /// Point both the queue and storage endpoints at `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.queue_url = base_url.clone();
        self.storage_url = base_url;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

fn key_header(api_key: &str) -> String {
    format!("Key {}", api_key)
}

/// fal.ai FFmpeg queue client.
pub struct FalClient {
    http: Client,
    config: FalConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl FalClient {
    pub fn new(config: FalConfig, credentials: Arc<dyn CredentialProvider>) -> ProviderResult<Self> {
        Ok(Self {
            http: http::build_client(PROVIDER, config.timeout)?,
            config,
            credentials,
        })
    }

    fn api_key(&self) -> ProviderResult<String> {
        self.credentials.require(CredentialKey::Fal, PROVIDER)
    }

    async fn submit(&self, api_key: &str, operation: &str, body: &Value) -> ProviderResult<Submission<AssetUrl>> {
        let url = http::endpoint(
            &self.config.queue_url,
            &format!("{}/{}", self.config.app, operation),
        );

        debug!(operation, "Submitting fal.ai request");
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, key_header(api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let data = http::read_json(PROVIDER, response).await?;
        interpret_submission(&data)
    }

    async fn poll_once(&self, api_key: &str, request_id: &str) -> ProviderResult<PollStatus<AssetUrl>> {
        let url = http::endpoint(
            &self.config.queue_url,
            &format!("{}/requests/{}", self.config.app, request_id),
        );
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, key_header(api_key))
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let data = http::read_json(PROVIDER, response).await?;
        match interpret_status(&data) {
            PollStatus::Done(raw) => match http::remote_url(PROVIDER, &raw) {
                Ok(url) => Ok(PollStatus::Done(url)),
                Err(e) => Ok(PollStatus::Failed(format!(
                    "Video merge completed but returned an invalid URL: {}",
                    e
                ))),
            },
            PollStatus::Pending(message) => Ok(PollStatus::Pending(message)),
            PollStatus::Failed(reason) => Ok(PollStatus::Failed(reason)),
        }
    }

    /// Submit a queue operation and wait for its output URL.
    async fn run_operation(
        &self,
        operation: &str,
        body: Value,
        label: &str,
        ctx: &JobContext,
    ) -> ProviderResult<GeneratedAsset> {
        let api_key = self.api_key()?;
        let api_key = api_key.as_str();
        let poller = AsyncJobPoller::new(PROVIDER, self.config.poll).with_label(label);

        let mut request_id = SceneUpdate::IMMEDIATE_JOB_ID.to_string();
        let url = poller
            .run(
                async {
                    let submission = self.submit(api_key, operation, &body).await?;
                    if let Submission::Pending(id) = &submission {
                        request_id = id.clone();
                    }
                    Ok::<_, ProviderError>(submission)
                },
                |id| async move { self.poll_once(api_key, &id).await },
                ctx,
            )
            .await?;

        Ok(GeneratedAsset::new(url, request_id))
    }
}

fn require_remote(url: &AssetUrl, what: &str) -> ProviderResult<()> {
    if url.is_remote() {
        Ok(())
    } else {
        Err(ProviderError::invalid_input(
            PROVIDER,
            format!("{} must be an http(s) URL, got {}", what, url),
        ))
    }
}

#[async_trait]
impl VideoStitcher for FalClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn stitch(&self, videos: &[AssetUrl], ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        match videos {
            [] => {
                return Err(ProviderError::invalid_input(
                    PROVIDER,
                    "at least one video is required for stitching",
                ))
            }
            [only] => {
                require_remote(only, "video")?;
                info!("Single clip, skipping merge");
                return Ok(GeneratedAsset::new(only.clone(), SceneUpdate::IMMEDIATE_JOB_ID));
            }
            _ => {}
        }

        for video in videos {
            require_remote(video, "video")?;
        }

        ctx.progress.status("Submitting video merge request to fal.ai...");
        let video_urls: Vec<&str> = videos.iter().map(AssetUrl::as_str).collect();
        let asset = self
            .run_operation("merge-videos", json!({ "video_urls": video_urls }), "Merging videos", ctx)
            .await?;

        ctx.progress.status("✓ Video merge completed!");
        info!(clips = videos.len(), request_id = %asset.job_id, "Merged videos");
        Ok(asset)
    }
}

#[async_trait]
impl AudioVideoMixer for FalClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn mix(&self, video: &AssetUrl, audio: &AssetUrl, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        require_remote(video, "video")?;
        require_remote(audio, "audio")?;

        ctx.progress.status("Mixing narration into video...");
        self.run_operation(
            "merge-audio-video",
            json!({ "video_url": video.as_str(), "audio_url": audio.as_str() }),
            "Mixing audio",
            ctx,
        )
        .await
    }
}

/// Classify a queue submission response.
fn interpret_submission(data: &Value) -> ProviderResult<Submission<AssetUrl>> {
    if let Some(raw) = first_match(extract::FAL_RESULT_URL, data) {
        return Ok(Submission::Immediate(http::remote_url(PROVIDER, &raw)?));
    }
    match first_match(extract::FAL_REQUEST_ID, data) {
        Some(id) => Ok(Submission::Pending(id)),
        None => Err(ProviderError::no_job_id(PROVIDER, http::snippet(&data.to_string()))),
    }
}

/// Classify a queue request lookup.
///
/// A result URL wins regardless of status. `FAILED`/`ERROR` are terminal, as
/// is a completed request without a URL.
fn interpret_status(data: &Value) -> PollStatus<String> {
    if let Some(url) = first_match(extract::FAL_RESULT_URL, data) {
        return PollStatus::Done(url);
    }

    let status = first_match(extract::FAL_STATUS, data)
        .unwrap_or_else(|| "IN_PROGRESS".to_string())
        .to_uppercase();

    match status.as_str() {
        "FAILED" | "ERROR" => {
            let reason = first_match(extract::FAL_ERROR, data).unwrap_or_else(|| "Unknown error".to_string());
            PollStatus::Failed(format!("Video merge failed: {}", reason))
        }
        "COMPLETED" | "SUCCESS" => {
            PollStatus::Failed("Video merge completed but no video URL was returned.".to_string())
        }
        _ => {
            debug!(status = %status, "fal.ai request not finished");
            PollStatus::Pending(None)
        }
    }
}

/// fal.ai file storage, used to host narration audio when R2 is not configured.
pub struct FalStorage {
    http: Client,
    config: FalConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl FalStorage {
    pub fn new(config: FalConfig, credentials: Arc<dyn CredentialProvider>) -> ProviderResult<Self> {
        Ok(Self {
            http: http::build_client(PROVIDER, config.timeout)?,
            config,
            credentials,
        })
    }
}

#[async_trait]
impl ObjectStore for FalStorage {
    fn name(&self) -> &str {
        "fal_storage"
    }

    async fn upload(&self, data: Vec<u8>, file_name: &str, content_type: &str) -> StorageResult<AssetUrl> {
        let api_key = self
            .credentials
            .credential(CredentialKey::Fal)
            .ok_or_else(|| StorageError::config_error("fal.ai key is not configured"))?;

        let base_name = file_name.rsplit('/').next().unwrap_or(file_name).to_string();
        let size = data.len();
        let part = Part::bytes(data)
            .file_name(base_name)
            .mime_str(content_type)
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let url = http::endpoint(&self.config.storage_url, "/storage/upload");
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, key_header(&api_key))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        if !status.is_success() {
            return Err(StorageError::upload_failed(format!(
                "fal.ai storage returned {}: {}",
                status,
                http::snippet(&text)
            )));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| StorageError::upload_failed(format!("invalid JSON from fal.ai storage: {}", e)))?;
        let raw = first_match(extract::FAL_STORAGE_URL, &body).ok_or_else(|| {
            StorageError::upload_failed(format!("no URL in fal.ai storage response: {}", http::snippet(&text)))
        })?;

        debug!(bytes = size, "Uploaded to fal.ai storage");
        AssetUrl::parse_remote(&raw).map_err(|e| StorageError::invalid_url(e.to_string()))
    }
}
