//! Bounded fixed-interval polling of asynchronous provider jobs.
//!
//! Every adapter that follows the "submit, poll, extract" idiom drives its
//! job through [`AsyncJobPoller`]. Polls that error (network blips, 5xx,
//! unparseable bodies) count as still pending; only a provider-reported
//! failure ends the loop early.

use std::future::Future;
use std::time::Duration;

use reel_models::{GenerationJob, JobStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::metrics;
use crate::progress::ProgressReporter;
use crate::retry::FailureTracker;

/// Consecutive poll errors logged before suppression.
const LOGGED_POLL_FAILURES: u32 = 3;

/// Outcome of a job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    /// The provider answered synchronously.
    Immediate(T),
    /// The provider accepted a job to be polled.
    Pending(String),
}

/// Outcome of one status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Still running, with an optional provider status line.
    Pending(Option<String>),
    Done(T),
    /// The provider reported a terminal failure.
    Failed(String),
}

impl<T> PollStatus<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollStatus<U> {
        match self {
            PollStatus::Pending(message) => PollStatus::Pending(message),
            PollStatus::Done(value) => PollStatus::Done(f(value)),
            PollStatus::Failed(reason) => PollStatus::Failed(reason),
        }
    }
}

/// Polling interval and attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Video generation: every 5 s, at most 120 polls (about 10 minutes).
    pub const VIDEO_GENERATION: PollPolicy = PollPolicy::new(Duration::from_secs(5), 120);

    /// Stitching and mixing: every 2 s, at most 300 polls (about 10 minutes).
    pub const STITCHING: PollPolicy = PollPolicy::new(Duration::from_secs(2), 300);

    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time a job is waited for.
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Per-call context handed to adapters: where to report progress and how to
/// learn that the caller gave up.
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    pub progress: ProgressReporter,
    pub cancel: CancellationToken,
}

impl JobContext {
    pub fn new(progress: ProgressReporter, cancel: CancellationToken) -> Self {
        Self { progress, cancel }
    }

    pub fn ensure_active(&self) -> ProviderResult<()> {
        if self.cancel.is_cancelled() {
            Err(ProviderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Drives one job from submission to a terminal value.
#[derive(Debug, Clone)]
pub struct AsyncJobPoller {
    provider: String,
    policy: PollPolicy,
    label: String,
}

impl AsyncJobPoller {
    pub fn new(provider: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            provider: provider.into(),
            policy,
            label: "Waiting for result".to_string(),
        }
    }

    /// Text shown in progress lines, e.g. "Merging videos".
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit a job and converge to its result.
    ///
    /// An immediate submission result is returned without polling.
    /// Submission errors propagate unchanged.
    pub async fn run<T, S, P, Fut>(&self, submit: S, poll_once: P, ctx: &JobContext) -> ProviderResult<T>
    where
        S: Future<Output = ProviderResult<Submission<T>>>,
        P: FnMut(String) -> Fut,
        Fut: Future<Output = ProviderResult<PollStatus<T>>>,
    {
        ctx.ensure_active()?;

        let submission = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = submit => result?,
        };

        match submission {
            Submission::Immediate(value) => {
                debug!(provider = %self.provider, "Provider answered synchronously");
                Ok(value)
            }
            Submission::Pending(job_id) => {
                info!(provider = %self.provider, job_id = %job_id, "Job submitted");
                ctx.progress.job_submitted(&self.provider, &job_id);
                self.wait(&job_id, poll_once, ctx).await
            }
        }
    }

    /// Poll an already-submitted job until it reaches a terminal state.
    pub async fn wait<T, P, Fut>(&self, job_id: &str, mut poll_once: P, ctx: &JobContext) -> ProviderResult<T>
    where
        P: FnMut(String) -> Fut,
        Fut: Future<Output = ProviderResult<PollStatus<T>>>,
    {
        let mut job = GenerationJob::new(
            self.provider.clone(),
            job_id,
            self.policy.interval,
            self.policy.max_attempts,
        );
        let mut failures = FailureTracker::new(LOGGED_POLL_FAILURES);

        while !job.attempts_exhausted() {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(self.cancelled(&mut job)),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(self.cancelled(&mut job)),
                outcome = poll_once(job_id.to_string()) => outcome,
            };

            match outcome {
                Ok(PollStatus::Done(value)) => {
                    failures.record_success();
                    job.record_poll(JobStatus::Succeeded, None);
                    metrics::record_poll(&self.provider, "done");
                    info!(
                        provider = %self.provider,
                        job_id = %job_id,
                        attempt = job.attempts,
                        "Job completed after {:?}",
                        job.elapsed()
                    );
                    return Ok(value);
                }
                Ok(PollStatus::Failed(reason)) => {
                    job.record_poll(JobStatus::Failed, Some(reason.clone()));
                    metrics::record_poll(&self.provider, "failed");
                    warn!(
                        provider = %self.provider,
                        job_id = %job_id,
                        attempt = job.attempts,
                        "Provider reported failure: {}",
                        reason
                    );
                    return Err(ProviderError::generation_failed(&self.provider, reason));
                }
                Ok(PollStatus::Pending(message)) => {
                    failures.record_success();
                    job.record_poll(JobStatus::Pending, message);
                    metrics::record_poll(&self.provider, "pending");
                }
                Err(e) => {
                    if failures.record_failure() {
                        warn!(
                            provider = %self.provider,
                            job_id = %job_id,
                            attempt = job.attempts + 1,
                            "Poll failed, treating as pending: {}",
                            e
                        );
                    }
                    job.record_poll(JobStatus::Pending, None);
                    metrics::record_poll(&self.provider, "error");
                }
            }

            ctx.progress.status(self.progress_line(&job));
        }

        job.finish(JobStatus::TimedOut);
        warn!(
            provider = %self.provider,
            job_id = %job_id,
            attempts = job.attempts,
            "Job timed out after {:?}",
            self.policy.ceiling()
        );
        Err(ProviderError::GenerationTimeout {
            provider: self.provider.clone(),
            job_id: job_id.to_string(),
            attempts: job.attempts,
        })
    }

    fn progress_line(&self, job: &GenerationJob) -> String {
        let secs = job.nominal_elapsed().as_secs();
        match &job.last_message {
            Some(status) => format!("{}: {} ({}s)", self.label, status, secs),
            None => format!("{}... ({}s)", self.label, secs),
        }
    }

    fn cancelled(&self, job: &mut GenerationJob) -> ProviderError {
        job.finish(JobStatus::Cancelled);
        info!(
            provider = %self.provider,
            job_id = %job.job_id,
            attempts = job.attempts,
            "Polling cancelled; remote job left running"
        );
        ProviderError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_attempts: u32) -> AsyncJobPoller {
        AsyncJobPoller::new("test", PollPolicy::new(Duration::from_millis(1), max_attempts))
    }

    #[tokio::test]
    async fn test_immediate_result_skips_polling() {
        let polls = AtomicU32::new(0);
        let result = fast(5)
            .run(
                async { Ok(Submission::Immediate("https://cdn.example/a.mp4")) },
                |_id| {
                    polls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(PollStatus::Pending(None)) }
                },
                &JobContext::default(),
            )
            .await;

        assert_eq!(result.unwrap(), "https://cdn.example/a.mp4");
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_done_after_exactly_n_polls() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let result = fast(10)
            .run(
                async { Ok(Submission::Pending("job-1".to_string())) },
                move |id| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        assert_eq!(id, "job-1");
                        if n < 4 {
                            Ok(PollStatus::Pending(Some("rendering".into())))
                        } else {
                            Ok(PollStatus::Done(n))
                        }
                    }
                },
                &JobContext::default(),
            )
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_timeout_after_max_attempts() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let err = fast(7)
            .wait::<(), _, _>(
                "job-2",
                move |_id| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(PollStatus::Pending(None)) }
                },
                &JobContext::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::GenerationTimeout { attempts: 7, .. }));
        assert_eq!(polls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_poll_errors_are_not_fatal() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let result = fast(10)
            .wait(
                "job-3",
                move |_id| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        match n {
                            1 => Err(ProviderError::malformed("test", "not json")),
                            2 => Err(ProviderError::Request {
                                provider: "test".into(),
                                status: 502,
                                body: String::new(),
                            }),
                            _ => Ok(PollStatus::Done("ok")),
                        }
                    }
                },
                &JobContext::default(),
            )
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reported_failure_is_fatal() {
        let err = fast(10)
            .wait::<(), _, _>(
                "job-4",
                |_id| async { Ok(PollStatus::Failed("content policy".to_string())) },
                &JobContext::default(),
            )
            .await
            .unwrap_err();

        match err {
            ProviderError::GenerationFailed { reason, .. } => assert_eq!(reason, "content policy"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_submission_error_propagates() {
        let err = fast(3)
            .run::<(), _, _, _>(
                async { Err(ProviderError::auth_expired("test", 401)) },
                |_id| async { Ok(PollStatus::Pending(None)) },
                &JobContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_auth_expired());
    }

    #[tokio::test]
    async fn test_cancellation_stops_polling() {
        let ctx = JobContext::default();
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();
        let token = ctx.cancel.clone();

        let poller = AsyncJobPoller::new("test", PollPolicy::new(Duration::from_millis(5), 1000));
        let err = poller
            .wait::<(), _, _>(
                "job-5",
                move |_id| {
                    if counter.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                        token.cancel();
                    }
                    async { Ok(PollStatus::Pending(None)) }
                },
                &ctx,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_job_submitted_event() {
        let ctx = JobContext::default();
        let mut rx = ctx.progress.subscribe();

        fast(3)
            .run(
                async { Ok(Submission::Pending("job-6".to_string())) },
                |_id| async { Ok(PollStatus::Done(())) },
                &ctx,
            )
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first.kind,
            crate::progress::ProgressKind::JobSubmitted {
                provider: "test".into(),
                job_id: "job-6".into()
            }
        );
    }

    #[test]
    fn test_policy_presets() {
        assert_eq!(PollPolicy::VIDEO_GENERATION.ceiling(), Duration::from_secs(600));
        assert_eq!(PollPolicy::STITCHING.ceiling(), Duration::from_secs(600));
    }
}
