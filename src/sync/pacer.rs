//! Minimum-spacing primitive for outbound request pacing

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum gap between consecutive yields.
///
/// The first call returns immediately; every later call suspends until the
/// requested gap has elapsed since the previous yield. The wait is an async
/// sleep, so a paced pass never blocks unrelated work on the runtime.
#[derive(Debug, Default)]
pub struct Pacer {
    last_yield: Option<Instant>,
}

impl Pacer {
    pub fn new() -> Self {
        Pacer { last_yield: None }
    }

    pub async fn pace(&mut self, min_gap: Duration) {
        if let Some(last) = self.last_yield {
            tokio::time::sleep_until(last + min_gap).await;
        }
        self.last_yield = Some(Instant::now());
    }
}
