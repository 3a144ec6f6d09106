//! Shared data models for the reel studio pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Scripts and scenes (including the script JSON contract)
//! - Video styles, engines and asset types
//! - Validated asset URLs
//! - Generation jobs and the stitched master artifact

pub mod asset_url;
pub mod error;
pub mod job;
pub mod master;
pub mod research;
pub mod scene;
pub mod script;
pub mod style;

// Re-export common types
pub use asset_url::{AssetUrl, UrlKind};
pub use error::{ModelError, ModelResult};
pub use job::{GenerationJob, JobStatus};
pub use master::MasterArtifact;
pub use research::{Fact, Research};
pub use scene::{Scene, SceneId, SceneUpdate};
pub use script::{script_json_schema, Script};
pub use style::{AssetType, VideoEngine, VideoStyle};
