//! Single-scene rendering.
//!
//! A scene moves through
//! `Empty -> GeneratingVisual -> VisualReady -> [GeneratingAudio -> AudioReady]
//! -> [Mixing -> Mixed] -> Done`, and any stage may end in `Failed`.
//!
//! Only the visual stage is fatal. Narration is best-effort: when it cannot
//! be produced or mixed the scene completes with the plain video and a
//! warning.

use std::fmt;
use std::sync::Arc;

use reel_models::{AssetType, AssetUrl, Scene, SceneUpdate, VideoEngine};
use reel_providers::{
    AudioVideoMixer, GeneratedAsset, GenerationRequest, ImageGenerator, JobContext, Narrator,
    ProviderError, ProviderResult, VideoGenerator,
};
use reel_storage::{narration_key, ObjectStore};
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

/// Where a scene is in its render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderStage {
    Empty,
    GeneratingVisual,
    VisualReady,
    GeneratingAudio,
    AudioReady,
    Mixing,
    Mixed,
    Done,
    Failed,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::Empty => "empty",
            RenderStage::GeneratingVisual => "generating_visual",
            RenderStage::VisualReady => "visual_ready",
            RenderStage::GeneratingAudio => "generating_audio",
            RenderStage::AudioReady => "audio_ready",
            RenderStage::Mixing => "mixing",
            RenderStage::Mixed => "mixed",
            RenderStage::Done => "done",
            RenderStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStage::Done | RenderStage::Failed)
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().replace('_', " "))
    }
}

/// Result of rendering one scene.
#[derive(Debug, Clone)]
pub struct RenderedScene {
    /// Delta for the caller to merge into its copy of the scene
    pub update: SceneUpdate,
    /// Final clip URL; the mixed clip when narration was applied
    pub url: AssetUrl,
    /// Engine that produced the visual, `None` when short-circuited
    pub engine: Option<VideoEngine>,
    pub short_circuited: bool,
    /// Non-fatal problems, e.g. narration that was skipped
    pub warnings: Vec<String>,
    /// Stages visited, in order
    pub stages: Vec<RenderStage>,
}

/// Records stage transitions for one scene.
struct StageTrack<'a> {
    scene: &'a Scene,
    index: usize,
    stages: Vec<RenderStage>,
}

impl<'a> StageTrack<'a> {
    fn new(scene: &'a Scene, index: usize) -> Self {
        Self {
            scene,
            index,
            stages: vec![RenderStage::Empty],
        }
    }

    fn advance(&mut self, stage: RenderStage) {
        debug!(
            scene_id = %self.scene.id,
            scene_index = self.index,
            stage = stage.as_str(),
            "Scene stage transition"
        );
        self.stages.push(stage);
    }

    fn fail(&mut self, stage: RenderStage, source: ProviderError) -> PipelineError {
        self.stages.push(RenderStage::Failed);
        metrics::record_scene_failure(stage);
        error!(
            scene_id = %self.scene.id,
            scene_index = self.index,
            stage = stage.as_str(),
            "Scene failed: {}",
            source
        );
        PipelineError::scene_failed(self.index, &self.scene.id, stage, source)
    }

    fn invalid(&mut self, reason: &str) -> PipelineError {
        self.stages.push(RenderStage::Failed);
        metrics::record_scene_failure(RenderStage::VisualReady);
        error!(scene_id = %self.scene.id, scene_index = self.index, "Scene rejected: {}", reason);
        PipelineError::scene_validation(self.index, &self.scene.id, reason)
    }
}

/// What the narration stage produced.
struct NarrationOutcome {
    audio: Option<AssetUrl>,
    mixed: Option<GeneratedAsset>,
    warning: Option<String>,
}

/// Renders one scene to a clip URL.
pub struct SceneRenderer {
    generators: Vec<Arc<dyn VideoGenerator>>,
    images: Option<Arc<dyn ImageGenerator>>,
    narrator: Option<Arc<dyn Narrator>>,
    mixer: Option<Arc<dyn AudioVideoMixer>>,
    narration_store: Option<Arc<dyn ObjectStore>>,
    config: PipelineConfig,
}

impl SceneRenderer {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            generators: Vec::new(),
            images: None,
            narrator: None,
            mixer: None,
            narration_store: None,
            config,
        }
    }

    /// Register a video generator. A later generator for the same engine
    /// replaces the earlier one.
    pub fn with_generator(mut self, generator: Arc<dyn VideoGenerator>) -> Self {
        let engine = generator.engine();
        self.generators.retain(|g| g.engine() != engine);
        self.generators.push(generator);
        self
    }

    pub fn with_image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_mixer(mut self, mixer: Arc<dyn AudioVideoMixer>) -> Self {
        self.mixer = Some(mixer);
        self
    }

    /// Storage for narration audio; must return URLs the mixer can fetch.
    pub fn with_narration_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.narration_store = Some(store);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn generator(&self, engine: VideoEngine) -> Option<&Arc<dyn VideoGenerator>> {
        self.generators.iter().find(|g| g.engine() == engine)
    }

    /// Render `scene`, the `index`-th (1-based) scene of a script about `topic`.
    ///
    /// The caller's scene is never modified; the returned update carries the
    /// new asset fields.
    pub async fn render(
        &self,
        scene: &Scene,
        index: usize,
        topic: &str,
        ctx: &JobContext,
    ) -> PipelineResult<RenderedScene> {
        let ctx = JobContext::new(
            ctx.progress.for_scene(index, scene.id.clone()),
            ctx.cancel.clone(),
        );
        if ctx.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut track = StageTrack::new(scene, index);

        // A resolved remote video is reused as is
        if let Some(url) = existing_video(scene) {
            ctx.progress.status(format!("Using existing video for Scene {}...", index));
            metrics::record_short_circuit();
            info!(scene_id = %scene.id, scene_index = index, "Scene already rendered, skipping");
            track.advance(RenderStage::Done);
            return Ok(RenderedScene {
                update: SceneUpdate::new(scene.id.clone()),
                url,
                engine: None,
                short_circuited: true,
                warnings: Vec::new(),
                stages: track.stages,
            });
        }

        track.advance(RenderStage::GeneratingVisual);
        let (visual, engine) = match self.generate_visual(scene, topic, &ctx).await {
            Ok(result) => result,
            Err(e) => return Err(track.fail(RenderStage::GeneratingVisual, e)),
        };
        track.advance(RenderStage::VisualReady);
        metrics::record_scene_rendered(engine);
        info!(
            scene_id = %scene.id,
            scene_index = index,
            engine = engine.as_str(),
            job_id = %visual.job_id,
            "Scene visual ready"
        );

        if visual.url.is_local() && self.config.require_durable_assets {
            return Err(track.invalid("video could only be stored in the local cache"));
        }

        let mut update = SceneUpdate::new(scene.id.clone())
            .with_asset(visual.url.as_str())
            .with_job_id(visual.job_id.clone());
        if scene.asset_type == AssetType::Image {
            update = update.with_asset_type(AssetType::Video);
        }
        // The job id can only be resumed on the engine that issued it
        if engine != scene.engine {
            update = update.with_engine(engine);
        }

        let mut url = visual.url.clone();
        let mut warnings = Vec::new();

        if scene.wants_narration(self.config.narration) {
            let outcome = self.apply_narration(scene, &visual.url, &mut track, &ctx).await?;
            if let Some(audio) = outcome.audio {
                update.audio_url = Some(audio.into_string());
            }
            if let Some(mixed) = outcome.mixed {
                update.asset_url = Some(mixed.url.as_str().to_string());
                url = mixed.url;
            }
            warnings.extend(outcome.warning);
        }

        track.advance(RenderStage::Done);
        Ok(RenderedScene {
            update,
            url,
            engine: Some(engine),
            short_circuited: false,
            warnings,
            stages: track.stages,
        })
    }

    /// Resume a known job or submit a new generation, with engine fallback.
    async fn generate_visual(
        &self,
        scene: &Scene,
        topic: &str,
        ctx: &JobContext,
    ) -> ProviderResult<(GeneratedAsset, VideoEngine)> {
        let primary = scene.engine;

        if let (Some(job_id), Some(generator)) = (scene.resumable_job_id(), self.generator(primary)) {
            ctx.progress.status("Polling for already-initiated video...");
            info!(scene_id = %scene.id, job_id, "Resuming provider job");
            match generator.resume(job_id, ctx).await {
                Ok(asset) => return Ok((asset, primary)),
                // A failed job produced nothing, so a new submission cannot duplicate it
                Err(ProviderError::GenerationFailed { reason, .. }) => {
                    ctx.progress.warning(format!(
                        "Previous job {} failed ({}); submitting a new generation",
                        job_id, reason
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        let request = GenerationRequest::for_scene(scene, topic, self.config.style);
        let mut chain = vec![primary];
        if self.config.engine_fallback {
            chain.push(primary.alternate());
        }

        let mut last_error: Option<ProviderError> = None;
        for engine in chain {
            let Some(generator) = self.generator(engine) else {
                debug!(engine = engine.as_str(), "No generator registered");
                continue;
            };
            if let Some(previous) = &last_error {
                warn!(scene_id = %scene.id, engine = engine.as_str(), "Falling back after: {}", previous);
                ctx.progress
                    .warning(format!("{}; retrying with {}", previous, engine));
            }

            match generator.generate(&request, ctx).await {
                Ok(asset) => return Ok((asset, engine)),
                Err(e) if e.allows_engine_fallback() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::invalid_input(primary.as_str(), "no video generator configured")
        }))
    }

    /// Synthesize, upload and mix narration. Never fails the scene except on
    /// cancellation.
    async fn apply_narration(
        &self,
        scene: &Scene,
        video: &AssetUrl,
        track: &mut StageTrack<'_>,
        ctx: &JobContext,
    ) -> PipelineResult<NarrationOutcome> {
        let (Some(narrator), Some(mixer)) = (&self.narrator, &self.mixer) else {
            return Ok(skip_narration(
                ctx,
                "unconfigured",
                None,
                "Narration requested but no TTS provider is configured".to_string(),
            ));
        };
        let Some(voice_id) = self.config.voice_id.as_deref() else {
            return Ok(skip_narration(
                ctx,
                "no_voice",
                None,
                "Narration requested but no voice is configured".to_string(),
            ));
        };
        if !video.is_remote() {
            return Ok(skip_narration(
                ctx,
                "local_video",
                None,
                "Video is only available locally; narration cannot be mixed".to_string(),
            ));
        }

        let audio = match scene.remote_audio_url() {
            Some(existing) => existing,
            None => {
                let Some(store) = &self.narration_store else {
                    return Ok(skip_narration(
                        ctx,
                        "no_store",
                        None,
                        "No storage configured for narration audio".to_string(),
                    ));
                };

                track.advance(RenderStage::GeneratingAudio);
                let bytes = match narrator.narrate(scene.text(), voice_id, ctx).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.is_cancelled() => return Err(PipelineError::Cancelled),
                    Err(e) => {
                        return Ok(skip_narration(ctx, "tts", None, format!("Narration failed: {}", e)))
                    }
                };

                let key = narration_key(scene.id.as_str());
                match store.upload(bytes, &key, narrator.content_type()).await {
                    Ok(url) if url.is_remote() => url,
                    Ok(url) => {
                        return Ok(skip_narration(
                            ctx,
                            "upload",
                            None,
                            format!("Narration stored at a non-remote URL ({})", url),
                        ))
                    }
                    Err(e) => {
                        return Ok(skip_narration(
                            ctx,
                            "upload",
                            None,
                            format!("Narration upload failed: {}", e),
                        ))
                    }
                }
            }
        };
        track.advance(RenderStage::AudioReady);

        track.advance(RenderStage::Mixing);
        match mixer.mix(video, &audio, ctx).await {
            Ok(mixed) => {
                track.advance(RenderStage::Mixed);
                info!(scene_id = %scene.id, "Narration mixed into scene");
                Ok(NarrationOutcome {
                    audio: Some(audio),
                    mixed: Some(mixed),
                    warning: None,
                })
            }
            Err(e) if e.is_cancelled() => Err(PipelineError::Cancelled),
            Err(e) => Ok(skip_narration(
                ctx,
                "mix",
                Some(audio),
                format!("Narration mix failed: {}", e),
            )),
        }
    }

    /// Generate a storyboard image for an image scene.
    pub async fn render_preview(
        &self,
        scene: &Scene,
        index: usize,
        topic: &str,
        ctx: &JobContext,
    ) -> PipelineResult<SceneUpdate> {
        let ctx = JobContext::new(
            ctx.progress.for_scene(index, scene.id.clone()),
            ctx.cancel.clone(),
        );
        let images = self
            .images
            .as_ref()
            .ok_or_else(|| PipelineError::config("no image generator configured"))?;

        let request = GenerationRequest::for_scene(scene, topic, self.config.style);
        let asset = images.generate_image(&request, &ctx).await.map_err(|e| {
            PipelineError::scene_failed(index, &scene.id, RenderStage::GeneratingVisual, e)
        })?;

        Ok(SceneUpdate::new(scene.id.clone())
            .with_asset(asset.url.into_string())
            .with_job_id(asset.job_id))
    }
}

/// The scene's video, when it already has a remote one.
fn existing_video(scene: &Scene) -> Option<AssetUrl> {
    if scene.asset_type != AssetType::Video {
        return None;
    }
    scene.remote_asset_url()
}

fn skip_narration(
    ctx: &JobContext,
    reason: &str,
    audio: Option<AssetUrl>,
    message: String,
) -> NarrationOutcome {
    metrics::record_narration_fallback(reason);
    warn!(reason, "Narration skipped: {}", message);
    ctx.progress.warning(format!("{}; using the plain video", message));
    NarrationOutcome {
        audio,
        mixed: None,
        warning: Some(message),
    }
}
