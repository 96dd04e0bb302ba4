//! Identifier-shape routing across quote sources

use async_trait::async_trait;
use tracing::warn;

use crate::core::quote::NavQuote;
use crate::providers::fund_page::FundPageProvider;
use crate::providers::quote_api::QuoteApiProvider;

/// How an identifier's shape routes it to a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStrategy {
    /// 1-5 uppercase letters: a quote-API ticker.
    QuoteApi,
    /// Exactly 6 digits: a local-market fund code for the scrape target.
    LocalScrape,
    /// Unrecognized shape, but a display name exists to query the API with.
    NameFallback,
    /// Nothing to route on; resolution short-circuits to no quote.
    Unmatched,
}

fn is_ticker(code: &str) -> bool {
    !code.is_empty() && code.len() <= 5 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn is_fund_code(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

/// Classifies an identifier. Pure; the network code matches on the result
/// exhaustively.
pub fn classify(code: &str, has_name: bool) -> SourceStrategy {
    if is_ticker(code) {
        SourceStrategy::QuoteApi
    } else if is_fund_code(code) {
        SourceStrategy::LocalScrape
    } else if has_name {
        SourceStrategy::NameFallback
    } else {
        SourceStrategy::Unmatched
    }
}

/// Resolves one asset identifier to a current NAV quote, or nothing.
///
/// Implementations never raise for an unresolvable identifier; transport and
/// parse failures are logged with their cause and degrade to `None`.
#[async_trait]
pub trait NavResolve: Send + Sync {
    async fn resolve(&self, code: &str, name: Option<&str>) -> Option<NavQuote>;
}

pub struct NavResolver {
    quote_api: QuoteApiProvider,
    fund_page: FundPageProvider,
}

impl NavResolver {
    pub fn new(quote_api: QuoteApiProvider, fund_page: FundPageProvider) -> Self {
        NavResolver {
            quote_api,
            fund_page,
        }
    }

    async fn query_api(&self, symbol: &str) -> Option<NavQuote> {
        match self.quote_api.fetch(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(error = %e, "Quote API lookup failed for {}", symbol);
                None
            }
        }
    }

    async fn scrape_page(&self, code: &str) -> Option<NavQuote> {
        match self.fund_page.fetch(code).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(error = %e, "Fund page lookup failed for {}", code);
                None
            }
        }
    }
}

#[async_trait]
impl NavResolve for NavResolver {
    async fn resolve(&self, code: &str, name: Option<&str>) -> Option<NavQuote> {
        let primary = match classify(code, name.is_some()) {
            SourceStrategy::QuoteApi => self.query_api(code).await,
            SourceStrategy::LocalScrape => self.scrape_page(code).await,
            SourceStrategy::NameFallback | SourceStrategy::Unmatched => None,
        };
        if primary.is_some() {
            return primary;
        }

        // A primary miss falls back to querying the API by display name. The
        // quote keeps the asset's own code so callers can match it back.
        if let Some(name) = name
            && let Some(mut quote) = self.query_api(name).await
        {
            quote.code = code.to_string();
            return Some(quote);
        }

        warn!("Unable to resolve a NAV source for code: {}", code);
        None
    }
}
