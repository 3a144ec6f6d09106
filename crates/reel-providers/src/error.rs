//! Provider error types.

use reel_models::ModelError;
use reel_storage::StorageError;
use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: no API key configured")]
    MissingCredential { provider: String },

    /// The provider rejected the credential. Recovery is re-authentication,
    /// not a retry of the same request.
    #[error("{provider}: API_KEY_EXPIRED (credential rejected with HTTP {status})")]
    AuthExpired { provider: String, status: u16 },

    #[error("{provider}: malformed response: {detail}")]
    MalformedResponse { provider: String, detail: String },

    #[error("{provider}: no job identifier or result URL in submission response: {snippet}")]
    NoJobIdentifierFound { provider: String, snippet: String },

    #[error("{provider}: job {job_id} still pending after {attempts} polls")]
    GenerationTimeout {
        provider: String,
        job_id: String,
        attempts: u32,
    },

    #[error("{provider}: generation failed: {reason}")]
    GenerationFailed { provider: String, reason: String },

    #[error("{provider}: invalid asset URL: {source}")]
    InvalidAssetUrl {
        provider: String,
        #[source]
        source: ModelError,
    },

    #[error("{provider}: request rejected with HTTP {status}: {body}")]
    Request {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider}: invalid input: {detail}")]
    InvalidInput { provider: String, detail: String },

    #[error("{provider}: network error: {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn missing_credential(provider: impl Into<String>) -> Self {
        Self::MissingCredential {
            provider: provider.into(),
        }
    }

    pub fn auth_expired(provider: impl Into<String>, status: u16) -> Self {
        Self::AuthExpired {
            provider: provider.into(),
            status,
        }
    }

    pub fn malformed(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    pub fn no_job_id(provider: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self::NoJobIdentifierFound {
            provider: provider.into(),
            snippet: snippet.into(),
        }
    }

    pub fn generation_failed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GenerationFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    /// Provider the error originated from, when known.
    pub fn provider(&self) -> Option<&str> {
        match self {
            ProviderError::MissingCredential { provider }
            | ProviderError::AuthExpired { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::NoJobIdentifierFound { provider, .. }
            | ProviderError::GenerationTimeout { provider, .. }
            | ProviderError::GenerationFailed { provider, .. }
            | ProviderError::InvalidAssetUrl { provider, .. }
            | ProviderError::Request { provider, .. }
            | ProviderError::InvalidInput { provider, .. }
            | ProviderError::Network { provider, .. } => Some(provider),
            ProviderError::Storage(_) | ProviderError::Cancelled => None,
        }
    }

    /// Check if the caller should prompt for new credentials.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ProviderError::AuthExpired { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }

    /// Check if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network { .. } | ProviderError::Storage(_) => true,
            ProviderError::Request { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if a scene may be retried on the other video engine.
    pub fn allows_engine_fallback(&self) -> bool {
        match self {
            ProviderError::MissingCredential { .. }
            | ProviderError::GenerationFailed { .. }
            | ProviderError::NoJobIdentifierFound { .. } => true,
            ProviderError::Request { status, .. } => *status != 401 && *status != 403,
            _ => false,
        }
    }
}
