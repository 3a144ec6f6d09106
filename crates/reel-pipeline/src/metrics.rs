//! Pipeline-level metric recorders.

use metrics::{counter, histogram};
use reel_models::VideoEngine;
use reel_providers::metrics::names;

use crate::renderer::RenderStage;

/// Record a scene rendered by a provider.
pub fn record_scene_rendered(engine: VideoEngine) {
    let labels = [("engine", engine.as_str().to_string())];
    counter!(names::SCENES_RENDERED_TOTAL, &labels).increment(1);
}

/// Record a scene skipped because its asset was already resolved.
pub fn record_short_circuit() {
    counter!(names::SCENE_SHORT_CIRCUITS_TOTAL).increment(1);
}

pub fn record_scene_failure(stage: RenderStage) {
    let labels = [("stage", stage.as_str().to_string())];
    counter!(names::SCENE_FAILURES_TOTAL, &labels).increment(1);
}

/// Record narration that was requested but not applied.
pub fn record_narration_fallback(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::NARRATION_FALLBACKS_TOTAL, &labels).increment(1);
}

pub fn record_stitch_duration(scene_count: usize, duration_secs: f64) {
    let labels = [("scenes", scene_count.to_string())];
    histogram!(names::STITCH_DURATION_SECONDS, &labels).record(duration_secs);
}
