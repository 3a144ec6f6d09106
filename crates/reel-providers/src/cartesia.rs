//! Cartesia text-to-speech.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::adapter::Narrator;
use crate::credentials::{CredentialKey, CredentialProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::poller::JobContext;
use crate::retry::{retry_async, RetryConfig};

const PROVIDER: &str = "cartesia";

#[derive(Debug, Clone)]
pub struct CartesiaConfig {
    pub base_url: String,
    /// Value of the `Cartesia-Version` header
    pub api_version: String,
    pub model: String,
    pub sample_rate: u32,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for CartesiaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cartesia.ai".to_string(),
            api_version: "2024-06-10".to_string(),
            model: "sonic-3".to_string(),
            sample_rate: 44_100,
            timeout: Duration::from_secs(60),
            retry: RetryConfig::new("cartesia tts"),
        }
    }
}

impl CartesiaConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model_id: &'a str,
    transcript: &'a str,
    voice: Voice<'a>,
    output_format: OutputFormat,
    speed: &'a str,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Voice<'a> {
    mode: &'a str,
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct OutputFormat {
    container: &'static str,
    encoding: &'static str,
    sample_rate: u32,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    speed: f32,
    volume: f32,
}

/// Cartesia narration client. Returns WAV (`pcm_f32le`) bytes.
pub struct CartesiaNarrator {
    http: Client,
    config: CartesiaConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl CartesiaNarrator {
    pub fn new(config: CartesiaConfig, credentials: Arc<dyn CredentialProvider>) -> ProviderResult<Self> {
        Ok(Self {
            http: http::build_client(PROVIDER, config.timeout)?,
            config,
            credentials,
        })
    }
}

#[async_trait]
impl Narrator for CartesiaNarrator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn narrate(&self, text: &str, voice_id: &str, ctx: &JobContext) -> ProviderResult<Vec<u8>> {
        let api_key = self.credentials.require(CredentialKey::Cartesia, PROVIDER)?;
        let transcript = text.trim();
        if transcript.is_empty() {
            return Err(ProviderError::invalid_input(PROVIDER, "narration text is empty"));
        }
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return Err(ProviderError::invalid_input(PROVIDER, "no voice id configured"));
        }
        ctx.ensure_active()?;

        let body = TtsRequest {
            model_id: &self.config.model,
            transcript,
            voice: Voice { mode: "id", id: voice_id },
            output_format: OutputFormat {
                container: "wav",
                encoding: "pcm_f32le",
                sample_rate: self.config.sample_rate,
            },
            speed: "normal",
            generation_config: GenerationConfig { speed: 1.0, volume: 1.0 },
        };
        let url = http::endpoint(&self.config.base_url, "/tts/bytes");

        ctx.progress.status("Generating narration...");
        debug!(chars = transcript.len(), "Requesting Cartesia narration");
        let audio = retry_async(&self.config.retry, || async {
            let response = self
                .http
                .post(&url)
                .header("X-API-Key", &api_key)
                .header("Cartesia-Version", &self.config.api_version)
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::network(PROVIDER, e))?;
            http::read_bytes(PROVIDER, response).await
        })
        .await?;

        info!(bytes = audio.len(), "Narration synthesized");
        Ok(audio)
    }
}
