//! Generative provider adapters.
//!
//! This crate provides:
//! - The async job poller shared by every long-running provider job
//! - Provider adapter traits and their HTTP implementations
//!   (KIE AI Veo, Gemini Veo, Gemini text/image, fal.ai, Cartesia)
//! - Alias extraction rules for inconsistent provider payloads
//! - The progress channel, credential resolution and retry helpers

pub mod adapter;
pub mod cartesia;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod fal;
pub mod finalize;
pub mod gemini;
mod http;
pub mod kie;
pub mod metrics;
pub mod poller;
pub mod progress;
pub mod retry;
pub mod veo;

pub use adapter::{
    AudioVideoMixer, GeneratedAsset, GenerationRequest, ImageGenerator, Narrator, ScriptWriter,
    VideoGenerator, VideoStitcher,
};
pub use cartesia::{CartesiaConfig, CartesiaNarrator};
pub use credentials::{CredentialKey, CredentialProvider, LayeredCredentials};
pub use error::{ProviderError, ProviderResult};
pub use fal::{FalClient, FalConfig, FalStorage};
pub use finalize::AssetFinalizer;
pub use gemini::{GeminiClient, GeminiConfig};
pub use kie::{KieConfig, KieVeoClient};
pub use poller::{AsyncJobPoller, JobContext, PollPolicy, PollStatus, Submission};
pub use progress::{ProgressEvent, ProgressKind, ProgressReporter, SceneContext};
pub use retry::{retry_async, FailureTracker, RetryConfig};
pub use veo::{GeminiVeoClient, VeoConfig};
