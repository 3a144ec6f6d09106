//! Pipeline configuration.

use std::str::FromStr;
use std::time::Duration;

use reel_models::{VideoEngine, VideoStyle};
use reel_providers::PollPolicy;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Polling policy for video generation jobs
    pub video_poll: PollPolicy,
    /// Polling policy for stitching and mixing jobs
    pub stitch_poll: PollPolicy,
    /// Engine used for scenes that do not name one
    pub default_engine: VideoEngine,
    /// Retry a scene on the other engine when the primary one fails
    pub engine_fallback: bool,
    /// Script-level narration flag; scenes may override it
    pub narration: bool,
    /// Voice used for narration
    pub voice_id: Option<String>,
    pub style: VideoStyle,
    /// Fail a scene whose visual could only be kept in the local cache
    pub require_durable_assets: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_poll: PollPolicy::VIDEO_GENERATION,
            stitch_poll: PollPolicy::STITCHING,
            default_engine: VideoEngine::KieVeo,
            engine_fallback: false,
            narration: false,
            voice_id: None,
            style: VideoStyle::Cinematic,
            require_durable_assets: false,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            video_poll: PollPolicy::new(
                Duration::from_secs(
                    env_parse("REEL_VIDEO_POLL_SECS")
                        .unwrap_or(defaults.video_poll.interval.as_secs()),
                ),
                env_parse("REEL_VIDEO_POLL_ATTEMPTS").unwrap_or(defaults.video_poll.max_attempts),
            ),
            stitch_poll: PollPolicy::new(
                Duration::from_secs(
                    env_parse("REEL_STITCH_POLL_SECS")
                        .unwrap_or(defaults.stitch_poll.interval.as_secs()),
                ),
                env_parse("REEL_STITCH_POLL_ATTEMPTS").unwrap_or(defaults.stitch_poll.max_attempts),
            ),
            default_engine: env_parse("REEL_DEFAULT_ENGINE").unwrap_or(defaults.default_engine),
            engine_fallback: env_flag("REEL_ENGINE_FALLBACK").unwrap_or(defaults.engine_fallback),
            narration: env_flag("REEL_NARRATION").unwrap_or(defaults.narration),
            voice_id: std::env::var("REEL_VOICE_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            style: env_parse("REEL_STYLE").unwrap_or(defaults.style),
            require_durable_assets: env_flag("REEL_REQUIRE_DURABLE_ASSETS")
                .unwrap_or(defaults.require_durable_assets),
        }
    }

    pub fn with_video_poll(mut self, poll: PollPolicy) -> Self {
        self.video_poll = poll;
        self
    }

    pub fn with_stitch_poll(mut self, poll: PollPolicy) -> Self {
        self.stitch_poll = poll;
        self
    }

    pub fn with_engine_fallback(mut self, enabled: bool) -> Self {
        self.engine_fallback = enabled;
        self
    }

    pub fn with_narration(mut self, enabled: bool, voice_id: Option<String>) -> Self {
        self.narration = enabled;
        self.voice_id = voice_id;
        self
    }

    pub fn with_style(mut self, style: VideoStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_require_durable_assets(mut self, required: bool) -> Self {
        self.require_durable_assets = required;
        self
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| parse_flag(&s))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.video_poll, PollPolicy::VIDEO_GENERATION);
        assert_eq!(config.stitch_poll, PollPolicy::STITCHING);
        assert_eq!(config.default_engine, VideoEngine::KieVeo);
        assert!(!config.engine_fallback);
        assert!(config.voice_id.is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
