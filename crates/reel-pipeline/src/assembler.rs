//! Master video assembly.

use std::sync::Arc;
use std::time::Instant;

use reel_models::{AssetUrl, MasterArtifact, Script, SceneUpdate};
use reel_providers::{JobContext, VideoStitcher};
use tracing::{info, Instrument};

use crate::error::{PipelineError, PipelineResult};
use crate::logging::RenderLogger;
use crate::metrics;
use crate::renderer::SceneRenderer;

/// Output of a successful assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOutcome {
    pub master: MasterArtifact,
    /// Per-scene deltas, in script order; empty updates are omitted
    pub updates: Vec<SceneUpdate>,
    /// Non-fatal problems collected from every scene
    pub warnings: Vec<String>,
}

/// Renders every scene in order and stitches the results.
///
/// Scenes are rendered one at a time. The first scene failure aborts the run
/// and nothing is stitched; scenes that completed before it were already
/// reported through `SceneUpdated` events, so a retry short-circuits them.
pub struct MasterAssembler {
    renderer: Arc<SceneRenderer>,
    stitcher: Arc<dyn VideoStitcher>,
}

impl MasterAssembler {
    pub fn new(renderer: Arc<SceneRenderer>, stitcher: Arc<dyn VideoStitcher>) -> Self {
        Self { renderer, stitcher }
    }

    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }

    pub async fn assemble(&self, script: &Script, ctx: &JobContext) -> PipelineResult<AssemblyOutcome> {
        let logger = RenderLogger::new("assemble_master");
        let span = logger.create_span();
        self.assemble_inner(script, ctx, &logger).instrument(span).await
    }

    async fn assemble_inner(
        &self,
        script: &Script,
        ctx: &JobContext,
        logger: &RenderLogger,
    ) -> PipelineResult<AssemblyOutcome> {
        script.validate()?;

        let total = script.scenes.len();
        logger.log_start(&format!("{} scenes, topic '{}'", total, script.topic));

        let mut urls: Vec<AssetUrl> = Vec::with_capacity(total);
        let mut updates = Vec::new();
        let mut warnings = Vec::new();

        for (offset, scene) in script.scenes.iter().enumerate() {
            let index = offset + 1;
            if ctx.cancel.is_cancelled() {
                logger.log_warning("cancelled");
                return Err(PipelineError::Cancelled);
            }
            ctx.progress.status(format!("Processing Scene {} of {}...", index, total));

            let rendered = match self.renderer.render(scene, index, &script.topic, ctx).await {
                Ok(rendered) => rendered,
                Err(e) => {
                    ctx.progress
                        .for_scene(index, scene.id.clone())
                        .status(format!("✗ Scene {} failed: {}", index, e));
                    logger.log_error(&e.to_string());
                    return Err(e);
                }
            };

            if !rendered.update.is_empty() {
                ctx.progress
                    .for_scene(index, scene.id.clone())
                    .scene_updated(rendered.update.clone());
                updates.push(rendered.update.clone());
            }
            warnings.extend(rendered.warnings.iter().cloned());

            if !rendered.url.is_remote() {
                let err = PipelineError::scene_validation(
                    index,
                    &scene.id,
                    "video is only available as a local reference and cannot be stitched",
                );
                logger.log_error(&err.to_string());
                return Err(err);
            }

            ctx.progress.status(format!("✓ Scene {} video ready", index));
            urls.push(rendered.url);
        }

        ctx.progress
            .status(format!("✓ All {} videos ready. Preparing to stitch...", urls.len()));
        ctx.progress.status("Stitching final cut with FFmpeg...");
        logger.log_progress(&format!("stitching {} clips with {}", urls.len(), self.stitcher.name()));

        let started = Instant::now();
        let stitched = self
            .stitcher
            .stitch(&urls, ctx)
            .await
            .map_err(PipelineError::stitching)?;
        metrics::record_stitch_duration(total, started.elapsed().as_secs_f64());

        if !stitched.url.is_remote() {
            return Err(PipelineError::StitchingFailed {
                reason: format!(
                    "Stitching completed but returned an invalid master video URL: {}",
                    stitched.url
                ),
                source: None,
            });
        }

        ctx.progress.status("✓ Master video stitched successfully!");
        logger.log_completion(stitched.url.as_str());
        info!(scenes = total, url = %stitched.url, "Master video assembled");

        Ok(AssemblyOutcome {
            master: MasterArtifact::new(stitched.url, total),
            updates,
            warnings,
        })
    }
}
