//! Retry/backoff policy and the manual "retry now" handle.
//!
//! The policy is pure: it classifies failures and computes delays. Waiting
//! happens in [`RetryHandle::wait`], which races the backoff timer against a
//! resume signal that any holder of the handle can fire.

use parking_lot::Mutex;
use portal_types::RetryConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::info;

use crate::error::PipelineError;

/// Retry decision result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after a delay.
    RetryAfter(Duration),
    /// Failure is retryable but the attempt budget is spent.
    Exhausted,
    /// Do not retry.
    DoNotRetry,
}

/// Per-request retry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryState {
    /// Failed attempts so far.
    pub attempt: u32,
    /// Delay before the next attempt, once one is scheduled.
    pub next_delay_ms: u64,
}

/// Exponential backoff over an allow-list of transient statuses.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base_delay_ms: u64,
    exponent_offset: u32,
    max_attempts: u32,
    statuses: Vec<u16>,
    retry_network_errors: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            base_delay_ms: config.base_delay_ms,
            exponent_offset: config.exponent_offset,
            max_attempts: config.max_attempts.max(1),
            statuses: config.statuses.clone(),
            retry_network_errors: config.retry_network_errors,
        }
    }

    /// Whether a response with `status` is worth another attempt.
    ///
    /// The attempt count never bounds retries here; the composer checks the
    /// budget through [`BackoffPolicy::has_budget`].
    pub fn should_retry(&self, status: u16, _attempt: u32) -> bool {
        self.statuses.contains(&status)
    }

    /// `2^(attempt + exponent_offset) * base_delay_ms`, saturating.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_add(self.exponent_offset);
        let factor = 2_u64.checked_pow(exponent).unwrap_or(u64::MAX);
        Duration::from_millis(factor.saturating_mul(self.base_delay_ms))
    }

    /// Whether another attempt may follow `failed_attempts` failures.
    pub fn has_budget(&self, failed_attempts: u32) -> bool {
        failed_attempts.saturating_add(1) < self.max_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Classify a failed attempt.
    pub fn decide(&self, error: &PipelineError, failed_attempts: u32) -> RetryDecision {
        let retryable = match error {
            PipelineError::Status { status, .. } => self.should_retry(*status, failed_attempts),
            PipelineError::Transport(err) => self.retry_network_errors && err.is_transient(),
            _ => false,
        };
        if !retryable {
            return RetryDecision::DoNotRetry;
        }
        if !self.has_budget(failed_attempts) {
            return RetryDecision::Exhausted;
        }
        RetryDecision::RetryAfter(self.delay_for_attempt(failed_attempts))
    }
}

#[derive(Debug)]
struct PendingResume {
    id: u64,
    resume: oneshot::Sender<()>,
}

/// Shared slot holding the resume signal of the most recently scheduled retry.
///
/// Owned by the pipeline and handed out by clone. Scheduling a new retry
/// replaces the previous entry; the displaced waiter keeps its timer.
#[derive(Debug, Clone, Default)]
pub struct RetryHandle {
    slot: Arc<Mutex<Option<PendingResume>>>,
    next_id: Arc<AtomicU64>,
}

impl RetryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume the most recently scheduled retry immediately.
    ///
    /// Returns `true` if a waiting retry was woken.
    pub fn retry_now(&self) -> bool {
        let pending = self.slot.lock().take();
        match pending {
            Some(pending) => pending.resume.send(()).is_ok(),
            None => false,
        }
    }

    /// Whether a scheduled retry is currently waiting.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|pending| !pending.resume.is_closed())
    }

    fn on_retry_scheduled(&self, delay: Duration) -> (u64, oneshot::Receiver<()>) {
        let (resume, receiver) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.slot.lock() = Some(PendingResume { id, resume });
        info!(
            delay_ms = delay.as_millis() as u64,
            "Retry scheduled; call RetryHandle::retry_now() to retry immediately"
        );
        (id, receiver)
    }

    fn release(&self, id: u64) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            *slot = None;
        }
    }

    /// Wait out `delay` unless resumed first. Returns `true` when resumed.
    pub async fn wait(&self, delay: Duration) -> bool {
        let (id, resume) = self.on_retry_scheduled(delay);
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        let signalled = tokio::select! {
            () = &mut timer => Some(false),
            signal = resume => signal.ok().map(|()| true),
        };
        let resumed = match signalled {
            Some(resumed) => resumed,
            // Displaced by a newer retry: fall back to the timer.
            None => {
                timer.await;
                false
            },
        };

        self.release(id);
        resumed
    }
}
