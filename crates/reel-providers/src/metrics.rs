//! Metric names and provider-level recorders.
//!
//! The library only records through the `metrics` facade; installing an
//! exporter is up to the embedding application.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const SCENES_RENDERED_TOTAL: &str = "reel_scenes_rendered_total";
    pub const SCENE_SHORT_CIRCUITS_TOTAL: &str = "reel_scene_short_circuits_total";
    pub const SCENE_FAILURES_TOTAL: &str = "reel_scene_failures_total";
    pub const PROVIDER_POLLS_TOTAL: &str = "reel_provider_polls_total";
    pub const NARRATION_FALLBACKS_TOTAL: &str = "reel_narration_fallbacks_total";
    pub const STITCH_DURATION_SECONDS: &str = "reel_stitch_duration_seconds";
}

/// Record one poll of a provider job.
pub fn record_poll(provider: &str, outcome: &str) {
    let labels = [
        ("provider", provider.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::PROVIDER_POLLS_TOTAL, &labels).increment(1);
}
