//! Pipeline error types.

use reel_models::{ModelError, SceneId};
use reel_providers::ProviderError;
use reel_storage::StorageError;
use thiserror::Error;

use crate::renderer::RenderStage;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A scene could not be rendered. Aborts the whole assembly.
    #[error("Failed to generate video for Scene {scene_index} ({scene_id}) while {stage}: {source}")]
    SceneFailed {
        /// 1-based position in the script
        scene_index: usize,
        scene_id: SceneId,
        stage: RenderStage,
        #[source]
        source: ProviderError,
    },

    #[error("Scene {scene_index} ({scene_id}) has no usable video URL: {reason}")]
    SceneValidation {
        scene_index: usize,
        scene_id: SceneId,
        reason: String,
    },

    #[error("Stitching failed: {reason}")]
    StitchingFailed {
        reason: String,
        #[source]
        source: Option<ProviderError>,
    },

    #[error(transparent)]
    InvalidScript(#[from] ModelError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Assembly cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn scene_failed(
        scene_index: usize,
        scene_id: &SceneId,
        stage: RenderStage,
        source: ProviderError,
    ) -> Self {
        if source.is_cancelled() {
            return Self::Cancelled;
        }
        Self::SceneFailed {
            scene_index,
            scene_id: scene_id.clone(),
            stage,
            source,
        }
    }

    pub fn scene_validation(scene_index: usize, scene_id: &SceneId, reason: impl Into<String>) -> Self {
        Self::SceneValidation {
            scene_index,
            scene_id: scene_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn stitching(source: ProviderError) -> Self {
        if source.is_cancelled() {
            return Self::Cancelled;
        }
        Self::StitchingFailed {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The underlying provider error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            PipelineError::SceneFailed { source, .. } => Some(source),
            PipelineError::StitchingFailed { source, .. } => source.as_ref(),
            PipelineError::Provider(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller should prompt for a new API key.
    pub fn is_auth_expired(&self) -> bool {
        self.provider_error().is_some_and(ProviderError::is_auth_expired)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    pub fn is_script_format(&self) -> bool {
        matches!(self, PipelineError::InvalidScript(e) if e.is_script_format())
    }

    /// The failing scene as `(index, id)`, for scene-level errors.
    pub fn scene(&self) -> Option<(usize, &SceneId)> {
        match self {
            PipelineError::SceneFailed { scene_index, scene_id, .. }
            | PipelineError::SceneValidation { scene_index, scene_id, .. } => {
                Some((*scene_index, scene_id))
            }
            _ => None,
        }
    }
}
