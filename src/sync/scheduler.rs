//! Recurring NAV sync: task body, hourly trigger and manual invocation

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::quote::NavQuote;
use crate::core::store::{AssetStore, SyncAsset};
use crate::core::task::{NAV_UPDATE_TASK, TaskRunRecord};
use crate::providers::resolver::NavResolve;
use crate::sync::batch::BatchFetcher;
use crate::sync::guard::{TaskGuard, TriggerOutcome};
use crate::sync::retry::RetryPolicy;

/// One full sync pass: list eligible assets, resolve their NAVs in a paced
/// batch, persist each result.
pub struct SyncTask {
    store: Arc<dyn AssetStore>,
    resolver: Arc<dyn NavResolve>,
    batch: BatchFetcher,
}

impl SyncTask {
    pub fn new(
        store: Arc<dyn AssetStore>,
        resolver: Arc<dyn NavResolve>,
        batch: BatchFetcher,
    ) -> Self {
        SyncTask {
            store,
            resolver,
            batch,
        }
    }

    /// Executes one attempt. Every failure is captured into the returned
    /// record; nothing propagates.
    pub async fn run_once(&self) -> TaskRunRecord {
        let mut record = TaskRunRecord::started(NAV_UPDATE_TASK);
        info!("Starting fund NAV update task");

        match self.execute().await {
            Ok(updated) => {
                info!("Task completed, updated {} assets", updated);
                record.finish_success(updated);
            }
            Err(e) => {
                error!(error = %e, "Fund NAV update task failed");
                record.finish_failed(e.to_string());
            }
        }

        record
    }

    async fn execute(&self) -> Result<usize> {
        let assets = self.store.list_sync_assets().await?;

        if assets.is_empty() {
            info!("No assets with a source code configured, nothing to sync");
            return Ok(0);
        }

        debug!("Found {} assets to update", assets.len());
        let quotes = self.batch.fetch_all(self.resolver.as_ref(), &assets).await;
        info!("Resolved {} of {} NAVs", quotes.len(), assets.len());

        let mut updated = 0;
        for quote in &quotes {
            let Some(asset) = assets.iter().find(|a| a.code == quote.code) else {
                continue;
            };
            match self.persist(asset, quote).await {
                Ok(()) => updated += 1,
                Err(e) => error!(error = %e, "Failed to update asset {}", asset.code),
            }
        }

        Ok(updated)
    }

    async fn persist(&self, asset: &SyncAsset, quote: &NavQuote) -> Result<()> {
        self.store.update_nav_value(asset.id, quote.value).await?;
        self.store
            .update_last_synced(asset.id, quote.fetched_at)
            .await?;
        Ok(())
    }
}

/// Time until the next top of the hour.
fn until_next_hour(now: DateTime<Utc>) -> std::time::Duration {
    let next = (now + ChronoDuration::hours(1))
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now + ChronoDuration::hours(1));
    (next - now).to_std().unwrap_or_default()
}

/// The single task lane for external NAV sync.
///
/// Owns the execution guard, the retry policy and the active schedule
/// handle, so every trigger -- hourly or manual -- funnels through one
/// place and at most one task body runs per process at any instant.
pub struct SyncService {
    task: Arc<SyncTask>,
    guard: Arc<TaskGuard>,
    retry: RetryPolicy,
    schedule: Mutex<Option<JoinHandle<()>>>,
}

async fn run_cycle(guard: &TaskGuard, retry: RetryPolicy, task: &Arc<SyncTask>) -> TriggerOutcome {
    guard
        .try_run(|| {
            let task = Arc::clone(task);
            async move {
                retry
                    .run(|| {
                        let task = Arc::clone(&task);
                        async move { task.run_once().await }
                    })
                    .await
            }
        })
        .await
}

impl SyncService {
    pub fn new(
        store: Arc<dyn AssetStore>,
        resolver: Arc<dyn NavResolve>,
        batch: BatchFetcher,
    ) -> Self {
        SyncService {
            task: Arc::new(SyncTask::new(store, resolver, batch)),
            guard: Arc::new(TaskGuard::new()),
            retry: RetryPolicy::default(),
            schedule: Mutex::new(None),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the full retry cycle now, unless a run is already in flight.
    pub async fn trigger_now(&self) -> TriggerOutcome {
        info!("Manual sync trigger requested");
        run_cycle(&self.guard, self.retry, &self.task).await
    }

    /// Registers the hourly schedule (top of every hour).
    ///
    /// Failure to register is logged, never raised: the host must keep
    /// serving without a scheduler.
    pub fn start(&self) {
        let mut schedule = self.schedule.lock().unwrap();
        if schedule.is_some() {
            warn!("Scheduler already started");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to start scheduler, continuing without one");
                return;
            }
        };

        let guard = Arc::clone(&self.guard);
        let task = Arc::clone(&self.task);
        let retry = self.retry;
        let handle = runtime.spawn(async move {
            loop {
                let wait = until_next_hour(Utc::now());
                debug!("Next scheduled sync in {}s", wait.as_secs());
                tokio::time::sleep(wait).await;

                info!("Hourly NAV sync triggered");
                // Fire-and-forget so stopping the schedule never cancels an
                // in-flight run; the guard absorbs any overlap.
                let guard = Arc::clone(&guard);
                let task = Arc::clone(&task);
                tokio::spawn(async move {
                    if let TriggerOutcome::Skipped = run_cycle(&guard, retry, &task).await {
                        info!("Previous run still in flight, scheduled sync skipped");
                    }
                });
            }
        });

        *schedule = Some(handle);
        info!("Fund NAV update scheduler started (hourly, at minute 0)");
    }

    /// Stops future scheduled runs. Idempotent, a no-op without an active
    /// schedule; an in-flight run completes on its own.
    pub fn stop(&self) {
        let mut schedule = self.schedule.lock().unwrap();
        if let Some(handle) = schedule.take() {
            handle.abort();
            info!("Scheduler stopped");
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.lock().unwrap().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub fn last_run(&self) -> Option<TaskRunRecord> {
        self.guard.last_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::{Currency, QuoteSource};
    use crate::core::task::TaskStatus;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestStore {
        assets: Vec<SyncAsset>,
        list_calls: AtomicUsize,
        fail_listing: bool,
        fail_update_for: Option<i64>,
        navs: Mutex<HashMap<i64, Decimal>>,
        synced: Mutex<HashMap<i64, DateTime<Utc>>>,
        gate: Option<tokio::sync::Semaphore>,
    }

    impl TestStore {
        fn with_assets(assets: Vec<SyncAsset>) -> Self {
            TestStore {
                assets,
                list_calls: AtomicUsize::new(0),
                fail_listing: false,
                fail_update_for: None,
                navs: Mutex::new(HashMap::new()),
                synced: Mutex::new(HashMap::new()),
                gate: None,
            }
        }

        fn empty() -> Self {
            Self::with_assets(vec![])
        }
    }

    #[async_trait]
    impl AssetStore for TestStore {
        async fn list_sync_assets(&self) -> Result<Vec<SyncAsset>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await?;
            }
            if self.fail_listing {
                anyhow::bail!("database unavailable");
            }
            Ok(self.assets.clone())
        }

        async fn update_nav_value(&self, id: i64, value: Decimal) -> Result<()> {
            if self.fail_update_for == Some(id) {
                anyhow::bail!("constraint violation for {}", id);
            }
            self.navs.lock().unwrap().insert(id, value);
            Ok(())
        }

        async fn update_last_synced(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
            self.synced.lock().unwrap().insert(id, at);
            Ok(())
        }
    }

    struct TestResolver {
        prices: HashMap<&'static str, &'static str>,
    }

    #[async_trait]
    impl NavResolve for TestResolver {
        async fn resolve(&self, code: &str, _name: Option<&str>) -> Option<NavQuote> {
            let price = self.prices.get(code)?;
            Some(NavQuote {
                code: code.to_string(),
                name: code.to_string(),
                value: Decimal::from_str(price).unwrap(),
                currency: Currency::Usd,
                fetched_at: Utc::now(),
                source: QuoteSource::QuoteApi,
            })
        }
    }

    fn asset(id: i64, code: &str) -> SyncAsset {
        SyncAsset {
            id,
            code: code.to_string(),
            name: None,
        }
    }

    fn service_with(store: Arc<TestStore>, prices: &[(&'static str, &'static str)]) -> SyncService {
        let resolver = Arc::new(TestResolver {
            prices: prices.iter().copied().collect(),
        });
        SyncService::new(
            store,
            resolver,
            BatchFetcher::new(Duration::ZERO, Duration::ZERO),
        )
    }

    #[test]
    fn test_until_next_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap();
        assert_eq!(
            until_next_hour(now),
            std::time::Duration::from_secs(44 * 60 + 30)
        );

        let top = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(until_next_hour(top), std::time::Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_empty_asset_list_short_circuits() {
        let store = Arc::new(TestStore::empty());
        let service = service_with(Arc::clone(&store), &[]);

        let outcome = service.trigger_now().await;

        let TriggerOutcome::Completed(record) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.items_processed, 0);
        assert_eq!(record.retries_attempted, 0);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_sync_persists_values() {
        let store = Arc::new(TestStore::with_assets(vec![
            asset(1, "VT"),
            asset(2, "004205"),
        ]));
        let service = service_with(
            Arc::clone(&store),
            &[("VT", "118.24"), ("004205", "15.82")],
        );

        let outcome = service.trigger_now().await;

        let TriggerOutcome::Completed(record) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.items_processed, 2);

        let navs = store.navs.lock().unwrap();
        assert_eq!(navs.get(&1), Some(&Decimal::from_str("118.24").unwrap()));
        assert_eq!(navs.get(&2), Some(&Decimal::from_str("15.82").unwrap()));
        assert_eq!(store.synced.lock().unwrap().len(), 2);

        let last = service.last_run().unwrap();
        assert_eq!(last.items_processed, 2);
    }

    #[tokio::test]
    async fn test_unresolved_assets_are_skipped_not_fatal() {
        let store = Arc::new(TestStore::with_assets(vec![
            asset(1, "VT"),
            asset(2, "GONE"),
        ]));
        let service = service_with(Arc::clone(&store), &[("VT", "118.24")]);

        let TriggerOutcome::Completed(record) = service.trigger_now().await else {
            panic!("expected a completed run");
        };
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.items_processed, 1);
    }

    #[tokio::test]
    async fn test_per_item_persist_error_is_skipped() {
        let mut store = TestStore::with_assets(vec![asset(1, "VT"), asset(2, "BND")]);
        store.fail_update_for = Some(2);
        let store = Arc::new(store);
        let service = service_with(
            Arc::clone(&store),
            &[("VT", "118.24"), ("BND", "72.50")],
        );

        let TriggerOutcome::Completed(record) = service.trigger_now().await else {
            panic!("expected a completed run");
        };
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.items_processed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_exhausts_retries() {
        let mut store = TestStore::empty();
        store.fail_listing = true;
        let store = Arc::new(store);
        let service = service_with(Arc::clone(&store), &[]);

        let TriggerOutcome::Completed(record) = service.trigger_now().await else {
            panic!("expected a completed run");
        };
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.retries_attempted, 3);
        assert_eq!(
            record.error_message.as_deref(),
            Some("database unavailable")
        );
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_custom_retry_policy_bounds_attempts() {
        let mut store = TestStore::empty();
        store.fail_listing = true;
        let store = Arc::new(store);
        let service = service_with(Arc::clone(&store), &[]).with_retry_policy(RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        });

        let TriggerOutcome::Completed(record) = service.trigger_now().await else {
            panic!("expected a completed run");
        };
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.retries_attempted, 1);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trigger_while_running_is_skipped() {
        let mut store = TestStore::with_assets(vec![asset(1, "VT")]);
        store.gate = Some(tokio::sync::Semaphore::new(0));
        let store = Arc::new(store);
        let service = Arc::new(service_with(Arc::clone(&store), &[("VT", "118.24")]));

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.trigger_now().await })
        };

        while !service.is_running() {
            tokio::task::yield_now().await;
        }

        let outcome = service.trigger_now().await;
        assert!(matches!(outcome, TriggerOutcome::Skipped));
        assert!(service.last_run().is_none());

        store.gate.as_ref().unwrap().add_permits(1);
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Completed(_)));
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_start_then_stop_never_fires() {
        let store = Arc::new(TestStore::with_assets(vec![asset(1, "VT")]));
        let service = service_with(Arc::clone(&store), &[("VT", "118.24")]);

        service.start();
        assert!(service.is_scheduled());
        service.stop();
        assert!(!service.is_scheduled());

        // The first tick is at least minutes away; give the aborted loop
        // time to have fired if stop() had not worked
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
        assert!(service.last_run().is_none());

        // stop is idempotent, also with no schedule registered
        service.stop();
    }

    #[tokio::test]
    async fn test_start_twice_keeps_one_schedule() {
        let store = Arc::new(TestStore::empty());
        let service = service_with(store, &[]);

        service.start();
        service.start();
        assert!(service.is_scheduled());
        service.stop();
        assert!(!service.is_scheduled());
    }
}
