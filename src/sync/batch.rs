//! Sequential paced NAV resolution across many assets

use std::time::Duration;
use tracing::debug;

use crate::core::quote::NavQuote;
use crate::core::store::SyncAsset;
use crate::providers::resolver::{NavResolve, SourceStrategy, classify};
use crate::sync::pacer::Pacer;

/// Resolves a list of assets strictly one at a time, with a minimum gap
/// between consecutive resolutions.
///
/// Sequential on purpose: the external sources run on free-tier quotas, so
/// smoothing request bursts matters more than throughput here. Failures are
/// omitted from the output; callers detect partial failure by comparing
/// counts, not by inspecting errors.
pub struct BatchFetcher {
    quote_pace: Duration,
    page_pace: Duration,
}

impl BatchFetcher {
    pub fn new(quote_pace: Duration, page_pace: Duration) -> Self {
        BatchFetcher {
            quote_pace,
            page_pace,
        }
    }

    fn pace_for(&self, strategy: SourceStrategy) -> Duration {
        match strategy {
            SourceStrategy::LocalScrape => self.page_pace,
            _ => self.quote_pace,
        }
    }

    /// Resolves every asset in input order. The output keeps the relative
    /// order of the successes; a chronically failing identifier is skipped,
    /// never aborts the pass. Empty input incurs no delay at all.
    pub async fn fetch_all(&self, resolver: &dyn NavResolve, assets: &[SyncAsset]) -> Vec<NavQuote> {
        let mut quotes = Vec::new();
        let mut pacer = Pacer::new();

        for asset in assets {
            let name = asset.name.as_deref();
            let pace = self.pace_for(classify(&asset.code, name.is_some()));
            pacer.pace(pace).await;

            match resolver.resolve(&asset.code, name).await {
                Some(quote) => quotes.push(quote),
                None => debug!("Skipping unresolved asset code: {}", asset.code),
            }
        }

        quotes
    }
}

impl Default for BatchFetcher {
    fn default() -> Self {
        BatchFetcher::new(Duration::from_millis(500), Duration::from_millis(1000))
    }
}
