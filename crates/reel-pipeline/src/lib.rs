//! Scene rendering and master assembly.
//!
//! This crate provides:
//! - `SceneRenderer`: one scene from prompt to clip URL, with optional narration
//! - `MasterAssembler`: every scene in order, then a single stitch
//! - `Studio`: production wiring of the provider adapters
//! - Pipeline configuration, logging and metrics

pub mod assembler;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod renderer;
pub mod studio;

pub use assembler::{AssemblyOutcome, MasterAssembler};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::{init_tracing, RenderLogger};
pub use renderer::{RenderStage, RenderedScene, SceneRenderer};
pub use studio::Studio;
