//! Shared HTTP plumbing for adapters.

use std::time::Duration;

use reel_models::AssetUrl;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::error::{ProviderError, ProviderResult};

/// Longest response excerpt carried in errors and logs.
const SNIPPET_CHARS: usize = 200;

pub(crate) fn build_client(provider: &str, timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::network(provider, e))
}

/// Truncate text for error messages.
pub(crate) fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Classify a non-success status. 401 is always `AuthExpired`.
async fn rejection(provider: &str, response: Response) -> ProviderError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return ProviderError::auth_expired(provider, status.as_u16());
    }
    let body = response.text().await.unwrap_or_default();
    warn!(provider = %provider, status = %status, "Provider rejected request: {}", snippet(&body));
    ProviderError::Request {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: error_message(&body).unwrap_or_else(|| snippet(&body)),
    }
}

/// Pull a human-readable message out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail", "msg", "error.message"]
        .iter()
        .find_map(|path| crate::extract::lookup(&value, path).and_then(Value::as_str))
        .map(str::to_string)
}

/// Parse a JSON body, classifying HTTP failures first.
pub(crate) async fn read_json(provider: &str, response: Response) -> ProviderResult<Value> {
    if !response.status().is_success() {
        return Err(rejection(provider, response).await);
    }
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::network(provider, e))?;
    serde_json::from_str(&text).map_err(|e| {
        ProviderError::malformed(provider, format!("invalid JSON ({}): {}", e, snippet(&text)))
    })
}

/// Read a binary body, classifying HTTP failures first.
pub(crate) async fn read_bytes(provider: &str, response: Response) -> ProviderResult<Vec<u8>> {
    if !response.status().is_success() {
        return Err(rejection(provider, response).await);
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProviderError::network(provider, e))?;
    if bytes.is_empty() {
        return Err(ProviderError::malformed(provider, "empty body"));
    }
    Ok(bytes.to_vec())
}

/// Validate a URL returned by a provider as a remote http(s) URL.
pub(crate) fn remote_url(provider: &str, raw: &str) -> ProviderResult<AssetUrl> {
    AssetUrl::parse_remote(raw).map_err(|source| ProviderError::InvalidAssetUrl {
        provider: provider.to_string(),
        source,
    })
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 3);
        assert_eq!(snippet("  short  "), "short");
    }

    #[test]
    fn test_error_message_aliases() {
        assert_eq!(error_message(r#"{"message":"quota"}"#).as_deref(), Some("quota"));
        assert_eq!(error_message(r#"{"error":{"message":"bad key"}}"#).as_deref(), Some("bad key"));
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("https://api.kie.ai/", "/api/v1/veo/generate"), "https://api.kie.ai/api/v1/veo/generate");
    }

    #[test]
    fn test_remote_url_rejects_local() {
        assert!(remote_url("fal", "https://v3.fal.media/x.mp4").is_ok());
        assert!(matches!(
            remote_url("fal", "blob:reel/1"),
            Err(ProviderError::InvalidAssetUrl { .. })
        ));
    }
}
