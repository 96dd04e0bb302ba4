//! Single-flight execution gate for the sync task

use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::core::task::TaskRunRecord;

/// Outcome of a guarded trigger.
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    Completed(TaskRunRecord),
    /// Another instance was already in flight; the task was not invoked.
    Skipped,
}

/// Process-wide single-flight gate plus the last-result snapshot.
///
/// The check-then-set on `running` is a single atomic operation, so
/// overlapping triggers -- the schedule firing again while the previous run
/// is mid-backoff, or a concurrent manual trigger -- collapse to one running
/// instance. This is the only shared mutable state in the sync core.
pub struct TaskGuard {
    running: AtomicBool,
    last_result: Mutex<Option<TaskRunRecord>>,
}

/// Clears the running flag when dropped, so the guard can never wedge shut:
/// the flag is released on every exit path, unwinding included.
struct RunningFlagRelease<'a>(&'a AtomicBool);

impl Drop for RunningFlagRelease<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TaskGuard {
    pub fn new() -> Self {
        TaskGuard {
            running: AtomicBool::new(false),
            last_result: Mutex::new(None),
        }
    }

    /// Runs the task unless one is already in flight.
    ///
    /// A skipped trigger does not invoke the task factory and leaves the
    /// last result untouched.
    pub async fn try_run<F, Fut>(&self, task: F) -> TriggerOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TaskRunRecord>,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Sync task already running, skipping trigger");
            return TriggerOutcome::Skipped;
        }

        let _release = RunningFlagRelease(&self.running);

        let record = task().await;
        *self.last_result.lock().unwrap() = Some(record.clone());
        TriggerOutcome::Completed(record)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_result(&self) -> Option<TaskRunRecord> {
        self.last_result.lock().unwrap().clone()
    }
}

impl Default for TaskGuard {
    fn default() -> Self {
        TaskGuard::new()
    }
}
