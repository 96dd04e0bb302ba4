//! GLOBAL_QUOTE-style JSON quote API client
//!
//! Quotes tickers (stocks, ETFs) against a free-tier quote API. The API does
//! not report a currency, so every quote comes back in its native USD.

use anyhow::anyhow;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::core::quote::{Currency, NavQuote, QuoteSource};
use crate::providers::FetchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct QuoteApiProvider {
    base_url: String,
    api_key: Option<String>,
}

impl QuoteApiProvider {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        QuoteApiProvider {
            base_url: base_url.to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetches the latest quote for `symbol`.
    ///
    /// Without a configured API key no request is attempted at all and the
    /// symbol resolves to nothing.
    #[instrument(name = "QuoteApiFetch", skip(self), fields(symbol = %symbol))]
    pub async fn fetch(&self, symbol: &str) -> Result<Option<NavQuote>, FetchError> {
        let Some(api_key) = &self.api_key else {
            warn!("Quote API key not configured, skipping");
            return Ok(None);
        };

        let url = format!("{}/query", self.base_url);
        debug!("Requesting quote from {}", url);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("navsync/1.0")
            .build()?;
        let response = client
            .get(&url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", api_key),
            ])
            .send()
            .await?;

        let body = response.text().await?;
        let parsed: QuoteResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Parse(format!("quote body for {symbol}: {e}")))?;

        if let Some(message) = parsed.error_message {
            error!(%message, "Quote API rejected the request for {}", symbol);
            return Ok(None);
        }

        if let Some(note) = parsed.note {
            return Err(FetchError::RateLimited(note));
        }

        let Some(quote) = parsed.quote else {
            warn!("No quote data for symbol: {}", symbol);
            return Ok(None);
        };
        let Some(price) = quote.price else {
            warn!("Quote for {} carries no price field", symbol);
            return Ok(None);
        };

        let value = Decimal::from_str(&price)
            .map_err(|e| FetchError::Parse(format!("price '{price}' for {symbol}: {e}")))?;
        if value.is_sign_negative() {
            return Err(FetchError::Parse(format!(
                "negative price '{price}' for {symbol}"
            )));
        }

        debug!("Fetched quote for {}: {}", symbol, value);

        Ok(Some(NavQuote {
            code: symbol.to_string(),
            name: quote.symbol.unwrap_or_else(|| symbol.to_string()),
            value,
            currency: Currency::Usd,
            fetched_at: Utc::now(),
            source: QuoteSource::QuoteApi,
        }))
    }

    /// Checks the API is reachable with the configured key. A rate-limit
    /// response still counts as reachable.
    pub async fn probe(&self) -> anyhow::Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("Quote API key not configured"));
        }

        match self.fetch("AAPL").await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(anyhow!("Quote API returned no data for a known symbol")),
            Err(FetchError::RateLimited(_)) => Ok(()),
            Err(e) => Err(anyhow!(e).context("Quote API probe failed")),
        }
    }
}

#[derive(Deserialize, Debug)]
struct QuoteResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
}

#[derive(Deserialize, Debug)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}
