pub mod core;
pub mod providers;
pub mod store;
pub mod sync;
pub mod ui;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::config::{AppConfig, DEFAULT_FUND_PAGE_URL, DEFAULT_QUOTE_API_URL};
use crate::providers::fund_page::FundPageProvider;
use crate::providers::quote_api::QuoteApiProvider;
use crate::providers::resolver::{NavResolver, SourceStrategy, classify};
use crate::store::memory::MemoryAssetStore;
use crate::sync::batch::BatchFetcher;
use crate::sync::guard::TriggerOutcome;
use crate::sync::scheduler::SyncService;

pub enum AppCommand {
    Sync,
    Watch,
    Check,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("NAV sync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Sync => run_sync(&config).await,
        AppCommand::Watch => run_watch(&config).await,
        AppCommand::Check => run_check(&config).await,
    }
}

fn build_providers(config: &AppConfig) -> (QuoteApiProvider, FundPageProvider) {
    let quote_base = config
        .providers
        .quote_api
        .as_ref()
        .map_or(DEFAULT_QUOTE_API_URL, |p| &p.base_url);
    let api_key = config
        .providers
        .quote_api
        .as_ref()
        .and_then(|p| p.api_key.as_deref());
    let page_base = config
        .providers
        .fund_page
        .as_ref()
        .map_or(DEFAULT_FUND_PAGE_URL, |p| &p.base_url);

    (
        QuoteApiProvider::new(quote_base, api_key),
        FundPageProvider::new(page_base),
    )
}

/// Wires the config-seeded store, the resolver and the sync service. The
/// store is returned separately so callers can inspect the synced rows.
pub fn build_service(config: &AppConfig) -> (Arc<MemoryAssetStore>, SyncService) {
    let (quote_api, fund_page) = build_providers(config);
    let resolver = Arc::new(NavResolver::new(quote_api, fund_page));
    let store = Arc::new(MemoryAssetStore::from_entries(&config.assets));
    let batch = BatchFetcher::new(
        Duration::from_millis(config.sync.quote_pace_ms),
        Duration::from_millis(config.sync.page_pace_ms),
    );
    let service = SyncService::new(Arc::clone(&store) as Arc<dyn crate::core::store::AssetStore>, resolver, batch);

    (store, service)
}

async fn run_sync(config: &AppConfig) -> Result<()> {
    let (store, service) = build_service(config);

    let spinner = ui::sync_spinner();
    let outcome = service.trigger_now().await;
    spinner.finish_and_clear();

    match outcome {
        TriggerOutcome::Completed(record) => {
            println!("{}", ui::render_run_record(&record));
            println!("{}", ui::render_assets(&store.snapshot().await));
        }
        TriggerOutcome::Skipped => {
            println!("A sync is already in progress, nothing to do.");
        }
    }

    Ok(())
}

async fn run_watch(config: &AppConfig) -> Result<()> {
    let (store, service) = build_service(config);

    service.start();
    println!("Scheduler running (hourly, at minute 0). Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;

    service.stop();
    if let Some(record) = service.last_run() {
        println!("{}", ui::render_run_record(&record));
        println!("{}", ui::render_assets(&store.snapshot().await));
    }

    Ok(())
}

async fn run_check(config: &AppConfig) -> Result<()> {
    let (quote_api, fund_page) = build_providers(config);

    match quote_api.probe().await {
        Ok(()) => println!("Quote API: reachable"),
        Err(e) => println!("Quote API: {e:#}"),
    }

    // Probe the fund site with a configured fund code, if any
    let probe_code = config
        .assets
        .iter()
        .find(|asset| classify(&asset.code, false) == SourceStrategy::LocalScrape)
        .map(|asset| asset.code.clone());

    match probe_code {
        Some(code) => match fund_page.probe(&code).await {
            Ok(()) => println!("Fund page: reachable"),
            Err(e) => println!("Fund page: {e:#}"),
        },
        None => println!("Fund page: no fund code configured, skipped"),
    }

    Ok(())
}
