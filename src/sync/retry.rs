//! Bounded exponential backoff around one logical task

use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::core::task::{NAV_UPDATE_TASK, TaskRunRecord};

/// Retry schedule for the sync task: up to `max_attempts` runs with an
/// exponentially growing, capped delay between failed attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay inserted after failed attempt number `attempt` (1-based):
    /// `initial_delay * 2^(attempt-1)`, capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs `task` until it reports success or attempts are exhausted.
    ///
    /// Every path resolves to a record: retry exhaustion is a normal terminal
    /// outcome carried in a `failed` record, never an error to the caller. No
    /// delay is slept after the final attempt, and the delays are async
    /// sleeps, so the process stays responsive to unrelated work throughout.
    pub async fn run<F, Fut>(&self, mut task: F) -> TaskRunRecord
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TaskRunRecord>,
    {
        let mut last_record = None;

        for attempt in 1..=self.max_attempts {
            let mut record = task().await;

            if record.is_success() {
                record.retries_attempted = attempt - 1;
                return record;
            }

            warn!(
                "Attempt {}/{} failed: {}",
                attempt,
                self.max_attempts,
                record.error_message.as_deref().unwrap_or("unknown error")
            );
            last_record = Some(record);

            if attempt < self.max_attempts {
                let delay = self.backoff_delay(attempt);
                debug!("Retrying in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
        }

        let mut record = last_record.unwrap_or_else(|| {
            let mut record = TaskRunRecord::started(NAV_UPDATE_TASK);
            record.finish_failed("Task was never attempted".to_string());
            record
        });
        record.retries_attempted = self.max_attempts;
        error!(
            "Task failed after {} attempts: {}",
            self.max_attempts,
            record.error_message.as_deref().unwrap_or("unknown error")
        );
        record
    }
}
