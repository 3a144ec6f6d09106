//! Model error types.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating models.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid script format: {0}")]
    InvalidScriptFormat(String),

    #[error("Invalid asset URL '{url}': {reason}")]
    InvalidAssetUrl { url: String, reason: String },

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl ModelError {
    pub fn invalid_script(msg: impl Into<String>) -> Self {
        Self::InvalidScriptFormat(msg.into())
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAssetUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn is_script_format(&self) -> bool {
        matches!(self, ModelError::InvalidScriptFormat(_))
    }
}
