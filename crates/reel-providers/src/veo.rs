//! Gemini API Veo video generation.
//!
//! Generation is a long-running operation polled by name. The finished video
//! is exposed as a content URI that requires the API key, so it is downloaded
//! and finalized through [`AssetFinalizer`] instead of being handed out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reel_models::VideoEngine;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::adapter::{GeneratedAsset, GenerationRequest, VideoGenerator};
use crate::credentials::{CredentialKey, CredentialProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::extract::{self, first_match};
use crate::finalize::AssetFinalizer;
use crate::http;
use crate::poller::{AsyncJobPoller, JobContext, PollPolicy, PollStatus, Submission};
use crate::retry::{retry_async, RetryConfig};

const PROVIDER: &str = "gemini_veo";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct VeoConfig {
    pub base_url: String,
    pub model: String,
    pub aspect_ratio: String,
    pub timeout: Duration,
    pub poll: PollPolicy,
}

impl Default for VeoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "veo-3.1-fast-generate-preview".to_string(),
            aspect_ratio: "9:16".to_string(),
            timeout: Duration::from_secs(120),
            poll: PollPolicy::VIDEO_GENERATION,
        }
    }
}

impl VeoConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

pub struct GeminiVeoClient {
    http: Client,
    config: VeoConfig,
    credentials: Arc<dyn CredentialProvider>,
    finalizer: AssetFinalizer,
}

impl GeminiVeoClient {
    pub fn new(
        config: VeoConfig,
        credentials: Arc<dyn CredentialProvider>,
        finalizer: AssetFinalizer,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http: http::build_client(PROVIDER, config.timeout)?,
            config,
            credentials,
            finalizer,
        })
    }

    fn api_key(&self) -> ProviderResult<String> {
        self.credentials.require(CredentialKey::Gemini, PROVIDER)
    }

    fn poller(&self) -> AsyncJobPoller {
        AsyncJobPoller::new(PROVIDER, self.config.poll).with_label("Rendering with Veo")
    }

    /// Start an operation and return its name.
    async fn submit(&self, api_key: &str, prompt: &str) -> ProviderResult<String> {
        let url = http::endpoint(
            &self.config.base_url,
            &format!("/v1beta/models/{}:predictLongRunning", self.config.model),
        );
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": self.config.aspect_ratio },
        });

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let data = http::read_json(PROVIDER, response).await?;
        match data.get("name").and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ProviderError::no_job_id(PROVIDER, http::snippet(&data.to_string()))),
        }
    }

    async fn poll_once(&self, api_key: &str, operation: &str) -> ProviderResult<PollStatus<String>> {
        let url = http::endpoint(&self.config.base_url, &format!("/v1beta/{}", operation));
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let data = http::read_json(PROVIDER, response).await?;
        Ok(interpret_operation(&data))
    }

    /// Download the finished video and persist it.
    async fn finalize(&self, api_key: &str, operation: &str, uri: &str, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        ctx.progress.status("Downloading generated video...");
        let retry = RetryConfig::new("veo_content_download");
        let bytes = retry_async(&retry, || async {
            let response = self
                .http
                .get(uri)
                .header(API_KEY_HEADER, api_key)
                .send()
                .await
                .map_err(|e| ProviderError::network(PROVIDER, e))?;
            http::read_bytes(PROVIDER, response).await
        })
        .await?;

        debug!("Downloaded {} bytes of Veo content", bytes.len());
        let file_name = reel_storage::scene_asset_key(&operation_suffix(operation), "mp4");
        let url = self.finalizer.finalize(bytes, &file_name, "video/mp4", ctx).await?;
        Ok(GeneratedAsset::new(url, operation))
    }

    async fn wait_and_finalize(&self, api_key: &str, operation: &str, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        let uri = self
            .poller()
            .wait(
                operation,
                |name| async move { self.poll_once(api_key, &name).await },
                ctx,
            )
            .await?;
        self.finalize(api_key, operation, &uri, ctx).await
    }
}

#[async_trait]
impl VideoGenerator for GeminiVeoClient {
    fn engine(&self) -> VideoEngine {
        VideoEngine::GeminiVeo
    }

    async fn generate(&self, request: &GenerationRequest, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        let api_key = self.api_key()?;
        let api_key = api_key.as_str();
        let prompt = request.enhanced_prompt();

        ctx.progress.status("Initiating scene generation with Veo...");
        let (operation, uri) = self
            .poller()
            .run(
                async { self.submit(api_key, &prompt).await.map(Submission::Pending) },
                |name| async move {
                    self.poll_once(api_key, &name)
                        .await
                        .map(|status| status.map(|uri| (name, uri)))
                },
                ctx,
            )
            .await?;

        info!(job_id = %operation, "Veo operation finished");
        self.finalize(api_key, &operation, &uri, ctx).await
    }

    async fn resume(&self, job_id: &str, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        let api_key = self.api_key()?;
        ctx.progress.status("Resuming Veo operation...");

        match self.poll_once(&api_key, job_id).await {
            Ok(PollStatus::Done(uri)) => return self.finalize(&api_key, job_id, &uri, ctx).await,
            Ok(PollStatus::Failed(reason)) => {
                return Err(ProviderError::generation_failed(PROVIDER, reason))
            }
            Ok(PollStatus::Pending(_)) | Err(_) => {}
        }
        self.wait_and_finalize(&api_key, job_id, ctx).await
    }
}

/// Classify a long-running operation.
fn interpret_operation(data: &Value) -> PollStatus<String> {
    if !data.get("done").and_then(Value::as_bool).unwrap_or(false) {
        return PollStatus::Pending(None);
    }

    if let Some(error) = data.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("operation failed");
        return PollStatus::Failed(message.to_string());
    }

    match first_match(extract::VEO_VIDEO_URI, data) {
        Some(uri) => PollStatus::Done(uri),
        None => PollStatus::Failed("operation finished without a video".to_string()),
    }
}

/// Last path segment of an operation name, for object keys.
fn operation_suffix(operation: &str) -> String {
    operation.rsplit('/').next().unwrap_or(operation).to_string()
}
