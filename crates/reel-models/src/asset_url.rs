//! Validated asset URLs.
//!
//! Every URL handed back by a provider adapter passes through [`AssetUrl::parse`].
//! Remote URLs (`http`/`https`) can be consumed by the stitching provider;
//! local references (`blob:` cache entries and inline `data:` payloads) are only
//! usable inside the current process.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::{ModelError, ModelResult};

/// Scheme prefix used for process-local blob references.
pub const LOCAL_BLOB_SCHEME: &str = "blob";

/// Where an asset URL points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    /// Absolute `http`/`https` URL reachable by remote providers.
    Remote,
    /// Process-local reference (`blob:` or `data:`).
    Local,
}

/// A URL that has been validated as an absolute http(s) URL or an accepted
/// local reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetUrl {
    raw: String,
    kind: UrlKind,
}

impl AssetUrl {
    /// Validate a URL string.
    pub fn parse(input: &str) -> ModelResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ModelError::invalid_url(input, "empty URL"));
        }

        let parsed = Url::parse(raw).map_err(|e| ModelError::invalid_url(raw, e.to_string()))?;

        let kind = match parsed.scheme() {
            "http" | "https" => {
                if parsed.host_str().map(str::is_empty).unwrap_or(true) {
                    return Err(ModelError::invalid_url(raw, "missing host"));
                }
                UrlKind::Remote
            }
            LOCAL_BLOB_SCHEME | "data" => UrlKind::Local,
            other => {
                return Err(ModelError::invalid_url(
                    raw,
                    format!("unsupported scheme '{}'", other),
                ))
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    /// Validate a URL that must be reachable by remote providers.
    pub fn parse_remote(input: &str) -> ModelResult<Self> {
        let url = Self::parse(input)?;
        if url.is_remote() {
            Ok(url)
        } else {
            Err(ModelError::invalid_url(input, "expected an http(s) URL"))
        }
    }

    /// Check whether a string is a valid remote URL without allocating an error.
    pub fn is_valid_remote(input: &str) -> bool {
        Self::parse_remote(input).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> UrlKind {
        self.kind
    }

    pub fn is_remote(&self) -> bool {
        self.kind == UrlKind::Remote
    }

    pub fn is_local(&self) -> bool {
        self.kind == UrlKind::Local
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for AssetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for AssetUrl {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Serialize for AssetUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for AssetUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AssetUrl::parse(&raw).map_err(serde::de::Error::custom)
    }
}
