//! In-process fake providers for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reel_models::{AssetType, AssetUrl, Research, Scene, Script, VideoEngine};
use reel_pipeline::{MasterAssembler, PipelineConfig, SceneRenderer};
use reel_providers::{
    AsyncJobPoller, AudioVideoMixer, GeneratedAsset, GenerationRequest, JobContext, Narrator,
    PollPolicy, PollStatus, ProgressEvent, ProviderError, ProviderResult, ScriptWriter,
    Submission, VideoGenerator, VideoStitcher,
};
use reel_storage::{ObjectStore, StorageResult};
use tokio::sync::broadcast;

pub const MASTER_URL: &str = "https://cdn.example/master.mp4";

pub fn fast_poll() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(1), 5)
}

fn url(raw: &str) -> AssetUrl {
    AssetUrl::parse(raw).unwrap()
}

/// How the fake generator answers a prompt.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Resolve on the first poll
    Video,
    /// Resolve to a local blob reference
    LocalVideo,
    /// Provider reports a terminal failure
    Fail(String),
    /// No credential configured
    MissingKey,
}

/// Video generator that polls through the real `AsyncJobPoller`.
pub struct FakeGenerator {
    engine: VideoEngine,
    outcomes: Mutex<HashMap<String, Outcome>>,
    pub generated: Mutex<Vec<String>>,
    pub resumed: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(engine: VideoEngine) -> Arc<Self> {
        Arc::new(Self {
            engine,
            outcomes: Mutex::new(HashMap::new()),
            generated: Mutex::new(Vec::new()),
            resumed: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        })
    }

    pub fn answer(&self, prompt: &str, outcome: Outcome) {
        self.outcomes.lock().unwrap().insert(prompt.to_string(), outcome);
    }

    pub fn generate_count(&self) -> usize {
        self.generated.lock().unwrap().len()
    }

    pub fn resume_count(&self) -> usize {
        self.resumed.lock().unwrap().len()
    }

    fn outcome(&self, prompt: &str) -> Outcome {
        self.outcomes
            .lock()
            .unwrap()
            .get(prompt)
            .cloned()
            .unwrap_or(Outcome::Video)
    }
}

#[async_trait]
impl VideoGenerator for FakeGenerator {
    fn engine(&self) -> VideoEngine {
        self.engine
    }

    async fn generate(&self, request: &GenerationRequest, ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        self.generated.lock().unwrap().push(request.prompt.clone());
        let outcome = self.outcome(&request.prompt);
        if let Outcome::MissingKey = outcome {
            return Err(ProviderError::missing_credential(self.engine.as_str()));
        }

        let job_id = format!("{}-{}", self.engine, request.prompt);
        let result_url = match &outcome {
            Outcome::LocalVideo => format!("blob:reel/{}", request.prompt),
            _ => format!("https://cdn.example/{}/{}.mp4", self.engine, request.prompt),
        };

        AsyncJobPoller::new(self.engine.as_str(), fast_poll())
            .run(
                async { Ok(Submission::Pending(job_id)) },
                |id| {
                    self.polls.fetch_add(1, Ordering::SeqCst);
                    let outcome = outcome.clone();
                    let result_url = result_url.clone();
                    async move {
                        match outcome {
                            Outcome::Fail(reason) => Ok(PollStatus::Failed(reason)),
                            _ => Ok(PollStatus::Done(GeneratedAsset::new(url(&result_url), id))),
                        }
                    }
                },
                ctx,
            )
            .await
    }

    async fn resume(&self, job_id: &str, _ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        self.resumed.lock().unwrap().push(job_id.to_string());
        Ok(GeneratedAsset::new(
            url(&format!("https://cdn.example/resumed/{}.mp4", job_id)),
            job_id,
        ))
    }
}

/// Stitcher recording every call.
pub struct FakeStitcher {
    pub calls: Mutex<Vec<Vec<String>>>,
    result: String,
}

impl FakeStitcher {
    pub fn new() -> Arc<Self> {
        Self::returning(MASTER_URL)
    }

    pub fn returning(result: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            result: result.to_string(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoStitcher for FakeStitcher {
    fn name(&self) -> &str {
        "fake_stitcher"
    }

    async fn stitch(&self, videos: &[AssetUrl], _ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        self.calls
            .lock()
            .unwrap()
            .push(videos.iter().map(|u| u.as_str().to_string()).collect());
        Ok(GeneratedAsset::new(url(&self.result), "stitch-1"))
    }
}

/// Narrator that either returns fixed bytes or has no credential.
pub struct FakeNarrator {
    has_key: bool,
    pub calls: AtomicUsize,
}

impl FakeNarrator {
    pub fn new(has_key: bool) -> Arc<Self> {
        Arc::new(Self {
            has_key,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Narrator for FakeNarrator {
    fn name(&self) -> &str {
        "fake_tts"
    }

    async fn narrate(&self, _text: &str, _voice_id: &str, _ctx: &JobContext) -> ProviderResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.has_key {
            Ok(b"RIFF".to_vec())
        } else {
            Err(ProviderError::missing_credential("fake_tts"))
        }
    }
}

pub struct FakeMixer {
    pub calls: AtomicUsize,
}

impl FakeMixer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AudioVideoMixer for FakeMixer {
    fn name(&self) -> &str {
        "fake_mixer"
    }

    async fn mix(&self, video: &AssetUrl, _audio: &AssetUrl, _ctx: &JobContext) -> ProviderResult<GeneratedAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mixed = video.as_str().replace(".mp4", "-mixed.mp4");
        Ok(GeneratedAsset::new(url(&mixed), "mix-1"))
    }
}

/// Object store handing out predictable URLs.
pub struct MemoryStore;

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, _data: Vec<u8>, file_name: &str, _content_type: &str) -> StorageResult<AssetUrl> {
        Ok(url(&format!("https://store.example/{}", file_name)))
    }
}

/// Script writer returning canned model output.
pub struct FakeWriter {
    pub raw: String,
}

#[async_trait]
impl ScriptWriter for FakeWriter {
    async fn research(&self, _topic: &str) -> ProviderResult<Research> {
        Ok(Research::default())
    }

    async fn write_script(&self, _topic: &str, _research: &Research) -> ProviderResult<String> {
        Ok(self.raw.clone())
    }
}

/// Script whose scene `n` has id `n` and visual prompt `p<n>`.
pub fn script(scene_count: usize) -> Script {
    Script {
        topic: "The Great Emu War".to_string(),
        hook: "Australia lost a war to birds.".to_string(),
        body: "In 1932...".to_string(),
        outro: "Follow for more forbidden history.".to_string(),
        scenes: (1..=scene_count)
            .map(|n| {
                Scene::new(
                    n.to_string().as_str(),
                    format!("0:{:02}", n * 5),
                    format!("Scene {} narration", n),
                    format!("p{}", n),
                    AssetType::Video,
                )
            })
            .collect(),
    }
}

pub fn renderer(config: PipelineConfig, generators: &[Arc<FakeGenerator>]) -> SceneRenderer {
    generators
        .iter()
        .fold(SceneRenderer::new(config), |renderer, g| renderer.with_generator(g.clone()))
}

pub fn assembler(renderer: SceneRenderer, stitcher: Arc<FakeStitcher>) -> MasterAssembler {
    MasterAssembler::new(Arc::new(renderer), stitcher)
}

/// Drain every event currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
