//! Credential resolution.
//!
//! Adapters never read keys from the environment themselves. They receive a
//! [`CredentialProvider`] at construction and resolve the key on every call,
//! so keys updated between runs take effect without rebuilding adapters.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::error::{ProviderError, ProviderResult};

/// Credential slots known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    Gemini,
    KieAi,
    Fal,
    Cartesia,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::Gemini => "gemini",
            CredentialKey::KieAi => "kieai",
            CredentialKey::Fal => "fal",
            CredentialKey::Cartesia => "cartesia",
        }
    }

    /// Environment variables consulted, in order.
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            CredentialKey::Gemini => &["GEMINI_API_KEY", "API_KEY"],
            CredentialKey::KieAi => &["KIEAI_API_KEY"],
            CredentialKey::Fal => &["FAL_KEY", "FAL_API_KEY"],
            CredentialKey::Cartesia => &["CARTESIA_API_KEY"],
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of provider API keys.
pub trait CredentialProvider: Send + Sync {
    /// Resolve a key. Blank values must be reported as `None`.
    fn credential(&self, key: CredentialKey) -> Option<String>;

    /// Resolve a key or fail with `MissingCredential` for `provider`.
    fn require(&self, key: CredentialKey, provider: &str) -> ProviderResult<String> {
        self.credential(key)
            .ok_or_else(|| ProviderError::missing_credential(provider))
    }
}

/// Caller-configured keys first, then the environment.
#[derive(Debug, Default)]
pub struct LayeredCredentials {
    configured: RwLock<HashMap<CredentialKey, String>>,
    read_env: bool,
}

impl LayeredCredentials {
    /// Configured values with environment fallback.
    pub fn new() -> Self {
        Self {
            configured: RwLock::new(HashMap::new()),
            read_env: true,
        }
    }

    /// Configured values only; the environment is never consulted.
    pub fn configured_only() -> Self {
        Self {
            configured: RwLock::new(HashMap::new()),
            read_env: false,
        }
    }

    pub fn with(self, key: CredentialKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set or replace a configured key.
    pub fn set(&self, key: CredentialKey, value: impl Into<String>) {
        let mut configured = self
            .configured
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        configured.insert(key, value.into());
    }

    /// Forget a configured key.
    pub fn clear(&self, key: CredentialKey) {
        let mut configured = self
            .configured
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        configured.remove(&key);
    }

    fn configured_value(&self, key: CredentialKey) -> Option<String> {
        let configured = self
            .configured
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        configured.get(&key).and_then(|v| non_blank(v))
    }
}

impl CredentialProvider for LayeredCredentials {
    fn credential(&self, key: CredentialKey) -> Option<String> {
        if let Some(value) = self.configured_value(key) {
            return Some(value);
        }
        if !self.read_env {
            return None;
        }
        key.env_vars()
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(|v| non_blank(&v)))
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
