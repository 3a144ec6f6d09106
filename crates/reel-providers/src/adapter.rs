//! Provider adapter traits.
//!
//! Each trait is one capability the pipeline needs from the outside world.
//! Adapters translate it into a specific provider's wire protocol and return
//! validated values; they never mutate caller-owned scenes.

use async_trait::async_trait;
use reel_models::{AssetUrl, Research, Scene, VideoEngine, VideoStyle};

use crate::error::ProviderResult;
use crate::poller::JobContext;

/// Appended to every video prompt after the style keywords.
pub const CONTINUITY_SUFFIX: &str = "Period-accurate details, dynamic camera movement, high motion, educational and informative visual storytelling. Characters and actions must clearly convey the historical narrative. Maintain consistent character appearance and environment across scenes.";

/// Request to generate one scene visual.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub scene_text: Option<String>,
    pub topic: Option<String>,
    pub style: VideoStyle,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            scene_text: None,
            topic: None,
            style: VideoStyle::default(),
        }
    }

    /// Request for a scene of a script about `topic`.
    pub fn for_scene(scene: &Scene, topic: &str, style: VideoStyle) -> Self {
        Self::new(scene.visual_prompt())
            .with_scene_text(scene.text())
            .with_topic(topic)
            .with_style(style)
    }

    pub fn with_scene_text(mut self, text: impl Into<String>) -> Self {
        self.scene_text = Some(text.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_style(mut self, style: VideoStyle) -> Self {
        self.style = style;
        self
    }

    /// Prompt sent to video providers: the visual prompt plus scene and topic
    /// context, style keywords and the continuity suffix.
    pub fn enhanced_prompt(&self) -> String {
        let mut prompt = self.prompt.trim().to_string();

        if let Some(text) = self.scene_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            prompt.push_str(&format!(" This scene illustrates: \"{}\".", text));
        }
        if let Some(topic) = self.topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            prompt.push_str(&format!(" Historical topic: {}.", topic));
        }

        prompt.push(' ');
        prompt.push_str(self.style.keywords());
        prompt.push(' ');
        prompt.push_str(CONTINUITY_SUFFIX);
        prompt
    }
}

/// A validated asset and the job that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAsset {
    pub url: AssetUrl,
    /// Provider job id, or `"immediate"` for synchronous answers
    pub job_id: String,
}

impl GeneratedAsset {
    pub fn new(url: AssetUrl, job_id: impl Into<String>) -> Self {
        Self {
            url,
            job_id: job_id.into(),
        }
    }
}

/// Text-to-video provider.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    fn engine(&self) -> VideoEngine;

    /// Submit a new generation and wait for the result.
    async fn generate(&self, request: &GenerationRequest, ctx: &JobContext) -> ProviderResult<GeneratedAsset>;

    /// Resume waiting on a job submitted earlier, without resubmitting.
    async fn resume(&self, job_id: &str, ctx: &JobContext) -> ProviderResult<GeneratedAsset>;
}

/// Text-to-image provider (storyboard previews).
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_image(&self, request: &GenerationRequest, ctx: &JobContext) -> ProviderResult<GeneratedAsset>;
}

/// Text-to-speech provider.
#[async_trait]
pub trait Narrator: Send + Sync {
    fn name(&self) -> &str;

    /// MIME type of the synthesized audio.
    fn content_type(&self) -> &str {
        "audio/wav"
    }

    /// Synthesize `text` with `voice_id`, returning encoded audio.
    async fn narrate(&self, text: &str, voice_id: &str, ctx: &JobContext) -> ProviderResult<Vec<u8>>;
}

/// Combines a video and a narration track into one clip.
#[async_trait]
pub trait AudioVideoMixer: Send + Sync {
    fn name(&self) -> &str;

    async fn mix(&self, video: &AssetUrl, audio: &AssetUrl, ctx: &JobContext) -> ProviderResult<GeneratedAsset>;
}

/// Concatenates clips, in order, into one video.
#[async_trait]
pub trait VideoStitcher: Send + Sync {
    fn name(&self) -> &str;

    async fn stitch(&self, videos: &[AssetUrl], ctx: &JobContext) -> ProviderResult<GeneratedAsset>;
}

/// Topic research and script drafting.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn research(&self, topic: &str) -> ProviderResult<Research>;

    /// Raw model output expected to satisfy the script JSON contract.
    async fn write_script(&self, topic: &str, research: &Research) -> ProviderResult<String>;
}
