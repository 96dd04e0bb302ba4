//! Run records for the scheduled synchronization task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the recurring NAV update task.
pub const NAV_UPDATE_TASK: &str = "fund-nav-update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

/// Outcome snapshot of one task execution. One record lives in the `Running`
/// state at most (enforced by the execution guard); exactly one "last" record
/// is retained per process, overwritten on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunRecord {
    pub task_name: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub retries_attempted: u32,
    pub items_processed: usize,
    pub error_message: Option<String>,
}

impl TaskRunRecord {
    /// A fresh record for a task that has just begun executing.
    pub fn started(task_name: &str) -> Self {
        TaskRunRecord {
            task_name: task_name.to_string(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            retries_attempted: 0,
            items_processed: 0,
            error_message: None,
        }
    }

    pub fn finish_success(&mut self, items_processed: usize) {
        self.status = TaskStatus::Success;
        self.items_processed = items_processed;
        self.ended_at = Some(Utc::now());
    }

    pub fn finish_failed(&mut self, error_message: String) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(error_message);
        self.ended_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}
