//! High-level entry point wiring the production providers together.

use std::sync::Arc;

use reel_models::{Script, SceneId};
use reel_providers::{
    AssetFinalizer, CartesiaConfig, CartesiaNarrator, CredentialProvider, FalClient, FalConfig,
    FalStorage, GeminiClient, GeminiConfig, GeminiVeoClient, JobContext, KieConfig, KieVeoClient,
    LayeredCredentials, ScriptWriter, VeoConfig,
};
use reel_storage::{LocalBlobCache, ObjectStore, R2Client};
use tracing::info;

use crate::assembler::{AssemblyOutcome, MasterAssembler};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::renderer::{RenderedScene, SceneRenderer};

/// Script drafting, scene rendering and master assembly behind one handle.
pub struct Studio {
    writer: Arc<dyn ScriptWriter>,
    assembler: MasterAssembler,
    config: PipelineConfig,
    cache: LocalBlobCache,
}

impl Studio {
    pub fn new(
        writer: Arc<dyn ScriptWriter>,
        assembler: MasterAssembler,
        config: PipelineConfig,
        cache: LocalBlobCache,
    ) -> Self {
        Self {
            writer,
            assembler,
            config,
            cache,
        }
    }

    /// Build a studio from environment variables (loads `.env` first).
    ///
    /// R2 is optional: without it, Veo content and storyboard images stay in
    /// the local cache and narration audio is hosted on fal.ai storage.
    pub fn from_env() -> PipelineResult<Self> {
        dotenvy::dotenv().ok();

        let config = PipelineConfig::from_env();
        let credentials: Arc<dyn CredentialProvider> = Arc::new(LayeredCredentials::new());
        Self::with_credentials(config, credentials)
    }

    /// Build a studio with explicit configuration and credentials.
    pub fn with_credentials(
        config: PipelineConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> PipelineResult<Self> {
        let r2: Option<Arc<dyn ObjectStore>> = match R2Client::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                info!("R2 storage not configured: {}", e);
                None
            }
        };

        let cache = LocalBlobCache::new();
        let finalizer = AssetFinalizer::new(r2.clone(), cache.clone());

        let gemini = Arc::new(GeminiClient::new(
            GeminiConfig::default(),
            credentials.clone(),
            finalizer.clone(),
        )?);
        let kie = Arc::new(KieVeoClient::new(
            KieConfig::default().with_poll(config.video_poll),
            credentials.clone(),
        )?);
        let veo = Arc::new(GeminiVeoClient::new(
            VeoConfig::default().with_poll(config.video_poll),
            credentials.clone(),
            finalizer,
        )?);
        let fal_config = FalConfig::default().with_poll(config.stitch_poll);
        let fal = Arc::new(FalClient::new(fal_config.clone(), credentials.clone())?);
        let narration_store: Arc<dyn ObjectStore> = match r2 {
            Some(store) => store,
            None => Arc::new(FalStorage::new(fal_config, credentials.clone())?),
        };
        let narrator = Arc::new(CartesiaNarrator::new(CartesiaConfig::default(), credentials)?);

        let renderer = SceneRenderer::new(config.clone())
            .with_generator(kie)
            .with_generator(veo)
            .with_image_generator(gemini.clone())
            .with_narrator(narrator)
            .with_mixer(fal.clone())
            .with_narration_store(narration_store);

        let assembler = MasterAssembler::new(Arc::new(renderer), fal);
        Ok(Self::new(gemini, assembler, config, cache))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cache holding assets that could not be stored durably.
    pub fn blob_cache(&self) -> &LocalBlobCache {
        &self.cache
    }

    /// Research `topic`, draft a script and validate it.
    ///
    /// Malformed model output fails with `InvalidScript` before any scene work.
    pub async fn draft_script(&self, topic: &str) -> PipelineResult<Script> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::config("topic must not be empty"));
        }

        let research = self.writer.research(topic).await?;
        info!(
            facts = research.facts.len(),
            sources = research.grounding_sources.len(),
            "Research complete"
        );

        let raw = self.writer.write_script(topic, &research).await?;
        let mut script = Script::from_provider_json(&raw)?;
        for scene in &mut script.scenes {
            scene.engine = self.config.default_engine;
        }

        info!(scenes = script.scenes.len(), "Script drafted");
        Ok(script)
    }

    /// Render a single scene of `script`.
    pub async fn render_scene(
        &self,
        script: &Script,
        scene_id: &SceneId,
        ctx: &JobContext,
    ) -> PipelineResult<RenderedScene> {
        let (offset, scene) = script
            .scenes
            .iter()
            .enumerate()
            .find(|(_, s)| &s.id == scene_id)
            .ok_or_else(|| PipelineError::config(format!("scene '{}' not found", scene_id)))?;

        self.assembler
            .renderer()
            .render(scene, offset + 1, &script.topic, ctx)
            .await
    }

    /// Render every scene and stitch the master video.
    pub async fn assemble(&self, script: &Script, ctx: &JobContext) -> PipelineResult<AssemblyOutcome> {
        self.assembler.assemble(script, ctx).await
    }
}
