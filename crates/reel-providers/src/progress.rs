//! Progress reporting for pipeline operations.
//!
//! Events are published on a broadcast channel so any number of observers
//! (UI bridge, tests, persistence of job ids) can subscribe. Every event is
//! also logged through `tracing`. Sending never blocks and never fails the
//! operation that emits it.

use std::fmt;
use std::time::{Duration, Instant};

use reel_models::{SceneId, SceneUpdate};
use tokio::sync::broadcast;
use tracing::{info, warn};

const DEFAULT_CAPACITY: usize = 256;

/// Scene an event refers to. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneContext {
    pub index: usize,
    pub id: SceneId,
}

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressKind {
    /// Human-readable status line
    Status(String),
    /// Non-fatal problem; the operation continues
    Warning(String),
    /// A provider accepted a job; persist the id to resume after a restart
    JobSubmitted { provider: String, job_id: String },
    /// A scene resolved; merge the delta into the caller's script
    SceneUpdated(SceneUpdate),
}

/// Progress event emitted during generation and assembly.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    /// Time since the reporter was created
    pub elapsed: Duration,
    pub scene: Option<SceneContext>,
}

impl ProgressEvent {
    pub fn is_warning(&self) -> bool {
        matches!(self.kind, ProgressKind::Warning(_))
    }

    /// The status or warning text, if any.
    pub fn message(&self) -> Option<&str> {
        match &self.kind {
            ProgressKind::Status(m) | ProgressKind::Warning(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scene) = &self.scene {
            write!(f, "Scene {}: ", scene.index)?;
        }
        match &self.kind {
            ProgressKind::Status(m) => write!(f, "{}", m),
            ProgressKind::Warning(m) => write!(f, "Warning: {}", m),
            ProgressKind::JobSubmitted { provider, job_id } => {
                write!(f, "{} job {} submitted", provider, job_id)
            }
            ProgressKind::SceneUpdated(update) => write!(f, "scene {} updated", update.scene_id),
        }
    }
}

/// Cloneable progress sink.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: broadcast::Sender<ProgressEvent>,
    started: Instant,
    scene: Option<SceneContext>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a reporter whose channel buffers `capacity` events per
    /// subscriber. Slow subscribers lose the oldest events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            started: Instant::now(),
            scene: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// A reporter sharing this channel that tags events with a scene.
    pub fn for_scene(&self, index: usize, id: SceneId) -> Self {
        Self {
            tx: self.tx.clone(),
            started: self.started,
            scene: Some(SceneContext { index, id }),
        }
    }

    pub fn scene(&self) -> Option<&SceneContext> {
        self.scene.as_ref()
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(ProgressKind::Status(message.into()));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(ProgressKind::Warning(message.into()));
    }

    pub fn job_submitted(&self, provider: &str, job_id: &str) {
        self.send(ProgressKind::JobSubmitted {
            provider: provider.to_string(),
            job_id: job_id.to_string(),
        });
    }

    pub fn scene_updated(&self, update: SceneUpdate) {
        self.send(ProgressKind::SceneUpdated(update));
    }

    fn send(&self, kind: ProgressKind) {
        let event = ProgressEvent {
            kind,
            elapsed: self.started.elapsed(),
            scene: self.scene.clone(),
        };

        let scene_id = self.scene.as_ref().map(|s| s.id.as_str()).unwrap_or("-");
        if event.is_warning() {
            warn!(scene_id = %scene_id, "{}", event);
        } else {
            info!(scene_id = %scene_id, "{}", event);
        }

        // Err only means nobody is subscribed
        let _ = self.tx.send(event);
    }
}
