//! Gemini text and image generation.
//!
//! Covers topic research (with the Google Search tool), script drafting and
//! storyboard image generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reel_models::{Fact, Research, SceneUpdate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapter::{GeneratedAsset, GenerationRequest, ImageGenerator, ScriptWriter};
use crate::credentials::{CredentialKey, CredentialProvider};
use crate::error::{ProviderError, ProviderResult};
use crate::finalize::AssetFinalizer;
use crate::http;
use crate::poller::JobContext;

const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// System instruction for script drafting.
pub const SCRIPT_SYSTEM_PROMPT: &str = r#"You write short, high-retention history videos for social media.
Voice: a sarcastic history teacher. Irreverent, witty and fast, but factually accurate.
Structure: a hook (0-3s) explaining why the topic was a disaster or just weird, two or three bizarre or ironic facts (3-45s), and an outro (45-60s) asking viewers to follow for more forbidden history.

Every visualPrompt must be a detailed, historically accurate video generation prompt:
- Describe recurring characters precisely the first time (clothing, hair, face) and repeat that exact description whenever they reappear.
- Name the period, the place and the environment.
- Specify composition, lighting and camera movement (tracking shot, slow zoom, low angle).
- Illustrate exactly what the scene text says.

Return ONLY a JSON object of this shape:
{
  "topic": "string",
  "hook": "string",
  "body": "string",
  "outro": "string",
  "scenes": [
    { "id": "1", "timestamp": "0:00", "text": "narration for the scene", "visualPrompt": "video prompt", "assetType": "video" }
  ]
}"#;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    /// Text models tried in order until one succeeds
    pub text_models: Vec<String>,
    pub image_model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            text_models: vec![
                "gemini-3-flash-preview".to_string(),
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-flash-lite".to_string(),
            ],
            image_model: "gemini-2.5-flash-image".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_text_models(mut self, models: Vec<String>) -> Self {
        self.text_models = models;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<Value>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.first_candidate()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    fn inline_data(&self) -> Option<&InlineData> {
        self.first_candidate()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
    }
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
    credentials: Arc<dyn CredentialProvider>,
    finalizer: AssetFinalizer,
}

impl GeminiClient {
    pub fn new(
        config: GeminiConfig,
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

    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let url = http::endpoint(
            &self.config.base_url,
            &format!("/v1beta/models/{}:generateContent", model),
        );

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        let body = http::read_json(PROVIDER, response).await?;
        serde_json::from_value(body).map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))
    }

    /// Try each configured text model in order; the first success wins.
    ///
    /// Rejected credentials end the search immediately.
    async fn generate_with_fallback(
        &self,
        request: &GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let api_key = self.api_key()?;
        let mut last_error = None;

        for model in &self.config.text_models {
            info!("Attempting Gemini API with model: {}", model);
            match self.generate_content(&api_key, model, request).await {
                Ok(response) if response.text().is_some() => return Ok(response),
                Ok(_) => {
                    warn!("Model {} returned no text", model);
                    last_error = Some(ProviderError::malformed(PROVIDER, "no text in response"));
                }
                Err(e) if e.is_auth_expired() => return Err(e),
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::invalid_input(PROVIDER, "no text models configured")))
    }

    /// Gather facts about `topic` with the Google Search tool.
    pub async fn research_topic(&self, topic: &str) -> ProviderResult<Research> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(format!(
                "Research the topic: \"{}\". Find 3 unique, bizarre or humorous facts that aren't widely known. Be factual but focus on irony.",
                topic
            ))],
            system_instruction: None,
            generation_config: None,
            tools: vec![serde_json::json!({ "google_search": {} })],
        };

        let response = self.generate_with_fallback(&request).await?;
        let grounding_sources = response
            .first_candidate()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|g| g.grounding_chunks.clone())
            .unwrap_or_default();

        Ok(Research {
            facts: vec![Fact {
                title: "Research Findings".to_string(),
                content: response.text().unwrap_or_default(),
                source_url: None,
            }],
            grounding_sources,
        })
    }

    /// Draft a script; returns raw model text for the script JSON contract.
    pub async fn generate_script(&self, topic: &str, research: &Research) -> ProviderResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(format!(
                "Topic: {}\nFacts: {}\nGenerate a high-retention viral script.",
                topic,
                research.facts_text()
            ))],
            system_instruction: Some(Content::text(SCRIPT_SYSTEM_PROMPT)),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
            tools: Vec::new(),
        };

        let response = self.generate_with_fallback(&request).await?;
        response
            .text()
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "no text in response"))
    }
}

#[async_trait]
impl ScriptWriter for GeminiClient {
    async fn research(&self, topic: &str) -> ProviderResult<Research> {
        self.research_topic(topic).await
    }

    async fn write_script(&self, topic: &str, research: &Research) -> ProviderResult<String> {
        self.generate_script(topic, research).await
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate_image(&self, request: &GenerationRequest, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        let api_key = self.api_key()?;
        ctx.ensure_active()?;
        ctx.progress.status("Generating storyboard image...");

        let body = GenerateContentRequest {
            contents: vec![Content::text(format!(
                "{}. Style: {}",
                request.prompt.trim(),
                request.style.keywords()
            ))],
            system_instruction: None,
            generation_config: None,
            tools: Vec::new(),
        };

        let response = self
            .generate_content(&api_key, &self.config.image_model, &body)
            .await?;
        let inline = response
            .inline_data()
            .ok_or_else(|| ProviderError::generation_failed(PROVIDER, "No image generated"))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.trim())
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("invalid image data: {}", e)))?;
        let mime = inline.mime_type.as_deref().unwrap_or("image/png");
        let extension = mime.rsplit('/').next().unwrap_or("png");

        let file_name = reel_storage::scene_asset_key("storyboard", extension);
        let url = self.finalizer.finalize(bytes, &file_name, mime, ctx).await?;
        Ok(GeneratedAsset::new(url, SceneUpdate::IMMEDIATE_JOB_ID))
    }
}
