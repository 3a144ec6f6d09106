//! Structured logging for assembly runs.
//!
//! Provides the tracing subscriber setup and a logger that tags every line
//! with the run id and operation.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// JSON output when `LOG_FORMAT=json`, coloured text otherwise. `RUST_LOG`
/// directives are honoured on top of a `reel=info` default. Calling this
/// more than once is harmless.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    // Target directives match by prefix, so this covers every reel_* crate
    let env_filter = match "reel=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Logger for one assembly run.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    run_id: String,
    operation: String,
}

impl RenderLogger {
    /// Create a logger for a new run with a generated id.
    pub fn new(operation: &str) -> Self {
        Self::from_string(&uuid::Uuid::new_v4().to_string(), operation)
    }

    /// Create a logger for an existing run id.
    pub fn from_string(run_id: &str, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Tracing span covering the run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "assembly",
            run_id = %self.run_id,
            operation = %self.operation
        )
    }
}
