//! Ephemeral generation job tracking.
//!
//! A [`GenerationJob`] lives for the duration of one poll loop and is never
//! persisted or shared across scenes.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a remote generation job as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, no poll yet
    #[default]
    Submitted,
    /// Last poll reported (or implied) work in progress
    Pending,
    /// Provider reported a result
    Succeeded,
    /// Provider reported a terminal failure
    Failed,
    /// Attempt ceiling reached while still pending
    TimedOut,
    /// Local polling was cancelled
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted provider job being polled to completion.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub provider: String,
    pub job_id: String,
    pub submitted_at: DateTime<Utc>,
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub attempts: u32,
    pub last_status: JobStatus,
    /// Last human-readable status reported by the provider
    pub last_message: Option<String>,
}

impl GenerationJob {
    pub fn new(
        provider: impl Into<String>,
        job_id: impl Into<String>,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            provider: provider.into(),
            job_id: job_id.into(),
            submitted_at: Utc::now(),
            poll_interval,
            max_attempts,
            attempts: 0,
            last_status: JobStatus::Submitted,
            last_message: None,
        }
    }

    /// Record a poll attempt.
    pub fn record_poll(&mut self, status: JobStatus, message: Option<String>) {
        self.attempts += 1;
        self.last_status = status;
        if message.is_some() {
            self.last_message = message;
        }
    }

    /// Move the job to a terminal status without counting an attempt.
    pub fn finish(&mut self, status: JobStatus) {
        self.last_status = status;
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Elapsed wall-clock time since submission.
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.submitted_at).to_std().unwrap_or_default()
    }

    /// Nominal elapsed time (attempts × interval), as shown to users.
    pub fn nominal_elapsed(&self) -> Duration {
        self.poll_interval.saturating_mul(self.attempts)
    }
}
