pub mod fund_page;
pub mod quote_api;
pub mod resolver;

use thiserror::Error;

/// Failure talking to an external quote source.
///
/// "No data for this identifier" is not an error at this layer; providers
/// report it as `Ok(None)`. These variants cover transport faults, responses
/// whose shape we cannot use, and explicit throttling signals, so callers can
/// log each cause distinctly before degrading to a missed quote.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unusable response: {0}")]
    Parse(String),

    #[error("source rate limit hit: {0}")]
    RateLimited(String),
}
