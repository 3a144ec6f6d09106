//! Scene model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset_url::AssetUrl;
use crate::style::{AssetType, VideoEngine};

/// Identifier of a scene, unique within its script and stable across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One narrative beat of the video.
///
/// `text` and `visual_prompt` are only mutable through setters so that an
/// edit always invalidates the generated asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: SceneId,

    /// Display-only "m:ss" timestamp
    pub timestamp: String,

    text: String,

    visual_prompt: String,

    pub asset_type: AssetType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    /// Remote task/operation id, kept so polling can resume after a reload
    #[serde(default, alias = "kieTaskId", skip_serializing_if = "Option::is_none")]
    pub provider_job_id: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_generating: bool,

    #[serde(default)]
    pub engine: VideoEngine,

    /// Per-scene override of the script-level narration flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_narration: Option<bool>,
}

impl Scene {
    pub fn new(
        id: impl Into<SceneId>,
        timestamp: impl Into<String>,
        text: impl Into<String>,
        visual_prompt: impl Into<String>,
        asset_type: AssetType,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            text: text.into(),
            visual_prompt: visual_prompt.into(),
            asset_type,
            asset_url: None,
            audio_url: None,
            provider_job_id: None,
            is_generating: false,
            engine: VideoEngine::default(),
            use_narration: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visual_prompt(&self) -> &str {
        &self.visual_prompt
    }

    /// Replace the narration text.
    ///
    /// A changed text invalidates the asset, the job id and the narration audio.
    /// Returns `true` when the value changed.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.text {
            return false;
        }
        self.text = text;
        self.invalidate_asset();
        self.audio_url = None;
        true
    }

    /// Replace the visual prompt.
    ///
    /// A changed prompt invalidates the asset and the job id. Narration audio
    /// still matches the text and is kept. Returns `true` when the value changed.
    pub fn set_visual_prompt(&mut self, prompt: impl Into<String>) -> bool {
        let prompt = prompt.into();
        if prompt == self.visual_prompt {
            return false;
        }
        self.visual_prompt = prompt;
        self.invalidate_asset();
        true
    }

    /// Clear the generated asset and its provider job.
    pub fn invalidate_asset(&mut self) {
        self.asset_url = None;
        self.provider_job_id = None;
    }

    /// Whether narration is requested for this scene.
    pub fn wants_narration(&self, script_default: bool) -> bool {
        self.use_narration.unwrap_or(script_default)
    }

    /// The stored asset URL, if it validates.
    pub fn valid_asset_url(&self) -> Option<AssetUrl> {
        self.asset_url.as_deref().and_then(|u| AssetUrl::parse(u).ok())
    }

    /// The stored asset URL, if it validates as a remote http(s) URL.
    pub fn remote_asset_url(&self) -> Option<AssetUrl> {
        self.valid_asset_url().filter(AssetUrl::is_remote)
    }

    /// The stored narration URL, if it validates as a remote http(s) URL.
    pub fn remote_audio_url(&self) -> Option<AssetUrl> {
        self.audio_url
            .as_deref()
            .and_then(|u| AssetUrl::parse_remote(u).ok())
    }

    /// Job id recorded for an in-flight generation (ignoring placeholder ids).
    pub fn resumable_job_id(&self) -> Option<&str> {
        self.provider_job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != SceneUpdate::IMMEDIATE_JOB_ID)
    }

    /// Merge a delta produced by the pipeline.
    pub fn apply_update(&mut self, update: &SceneUpdate) {
        if update.scene_id != self.id {
            return;
        }
        if let Some(url) = &update.asset_url {
            self.asset_url = Some(url.clone());
        }
        if let Some(url) = &update.audio_url {
            self.audio_url = Some(url.clone());
        }
        if let Some(job_id) = &update.provider_job_id {
            self.provider_job_id = Some(job_id.clone());
        }
        if let Some(asset_type) = update.asset_type {
            self.asset_type = asset_type;
        }
        if let Some(engine) = update.engine {
            self.engine = engine;
        }
    }

    /// Copy-on-write variant of [`Scene::apply_update`].
    pub fn with_update(&self, update: &SceneUpdate) -> Scene {
        let mut scene = self.clone();
        scene.apply_update(update);
        scene
    }
}

/// Asset fields produced for one scene, for the caller to merge back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneUpdate {
    pub scene_id: SceneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_job_id: Option<String>,
    /// Set when an image scene was rendered to video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    /// Engine that produced the asset, set when it differs from the scene's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<VideoEngine>,
}

impl SceneUpdate {
    /// Job id recorded when a provider answered synchronously.
    pub const IMMEDIATE_JOB_ID: &'static str = "immediate";

    pub fn new(scene_id: SceneId) -> Self {
        Self {
            scene_id,
            asset_url: None,
            audio_url: None,
            provider_job_id: None,
            asset_type: None,
            engine: None,
        }
    }

    pub fn with_asset(mut self, url: impl Into<String>) -> Self {
        self.asset_url = Some(url.into());
        self
    }

    pub fn with_audio(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.provider_job_id = Some(job_id.into());
        self
    }

    pub fn with_asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn with_engine(mut self, engine: VideoEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.asset_url.is_none()
            && self.audio_url.is_none()
            && self.provider_job_id.is_none()
            && self.asset_type.is_none()
            && self.engine.is_none()
    }
}
