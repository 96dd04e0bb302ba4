//! Fund overview page scraper
//!
//! Local-market funds publish their NAV on a public fund-center page rather
//! than any API. The NAV sits in a single heading element; the currency is
//! only hinted at inside that same label text.

use anyhow::{Context, anyhow};
use chrono::Utc;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::core::quote::{Currency, NavQuote, QuoteSource, parse_nav_label};
use crate::providers::FetchError;

/// The fund site rejects default HTTP client agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The NAV heading on the fund overview page.
const NAV_SELECTOR: &str = "h3.text-4xl.basis-10.shrink-0.mt-2.mb-3";
const NAME_SELECTOR: &str = "h1, h2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FundPageProvider {
    base_url: String,
}

struct PageExtract {
    nav_label: String,
    name: Option<String>,
}

/// Pulls the NAV label and fund name out of the page markup. Kept synchronous
/// so the parsed document never lives across an await point.
fn extract_page(html: &str) -> Option<PageExtract> {
    let document = Html::parse_document(html);

    let nav_selector = Selector::parse(NAV_SELECTOR).ok()?;
    let nav_label = document
        .select(&nav_selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    if nav_label.is_empty() {
        return None;
    }

    let name = Selector::parse(NAME_SELECTOR).ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())
    });

    Some(PageExtract { nav_label, name })
}

impl FundPageProvider {
    pub fn new(base_url: &str) -> Self {
        FundPageProvider {
            base_url: base_url.to_string(),
        }
    }

    fn fund_url(&self, code: &str) -> String {
        format!("{}/fundCenter/fundOverview/fundContent/{}", self.base_url, code)
    }

    /// Scrapes the current NAV for a fund code.
    ///
    /// A page without the NAV element, or with a label that carries no
    /// parsable number, resolves to `Ok(None)`; the markup drifts more often
    /// than the site goes down.
    #[instrument(name = "FundPageFetch", skip(self), fields(code = %code))]
    pub async fn fetch(&self, code: &str) -> Result<Option<NavQuote>, FetchError> {
        let url = self.fund_url(code);
        debug!("Requesting fund page {}", url);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        let response = client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited(format!(
                "fund page throttled request for {code}"
            )));
        }

        let html = response.text().await?;

        let Some(page) = extract_page(&html) else {
            warn!("No NAV found on fund page for code: {}", code);
            return Ok(None);
        };

        let Some(value) = parse_nav_label(&page.nav_label) else {
            warn!(label = %page.nav_label, "Could not parse NAV value for {}", code);
            return Ok(None);
        };

        let currency = Currency::infer_from_label(&page.nav_label);
        debug!("Fetched NAV for {}: {} {}", code, value, currency);

        Ok(Some(NavQuote {
            code: code.to_string(),
            name: page.name.unwrap_or_else(|| code.to_string()),
            value,
            currency,
            fetched_at: Utc::now(),
            source: QuoteSource::PrimaryScrape,
        }))
    }

    /// Checks the fund site answers for a known fund code.
    pub async fn probe(&self, code: &str) -> anyhow::Result<()> {
        let url = self.fund_url(code);

        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Fund page unreachable at {url}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            error!("Fund page probe returned HTTP {}", response.status());
            Err(anyhow!("Fund page probe returned HTTP {}", response.status()))
        }
    }
}
