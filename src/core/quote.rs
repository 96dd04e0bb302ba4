//! NAV quote domain types and label-parsing rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Currencies a NAV can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Twd,
    Usd,
    Cny,
    Jpy,
    Eur,
    Zar,
    Aud,
}

/// Ordered marker table for currency inference. Each entry pairs the Latin
/// abbreviation with the localized token found on the fund page; the first
/// entry whose marker appears in the label wins.
const CURRENCY_MARKERS: &[(Currency, [&str; 2])] = &[
    (Currency::Usd, ["usd", "美金"]),
    (Currency::Cny, ["rmb", "人民幣"]),
    (Currency::Jpy, ["jpy", "日圓"]),
    (Currency::Eur, ["eur", "歐元"]),
    (Currency::Zar, ["zar", "南非幣"]),
    (Currency::Aud, ["aud", "澳幣"]),
];

impl Currency {
    /// The home currency, assumed when a label carries no marker.
    pub const HOME: Currency = Currency::Twd;

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Twd => "TWD",
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
            Currency::Jpy => "JPY",
            Currency::Eur => "EUR",
            Currency::Zar => "ZAR",
            Currency::Aud => "AUD",
        }
    }

    /// Infers the currency from a NAV label scraped off the fund page.
    ///
    /// Matching is case-insensitive and substring-based against the marker
    /// table; labels without any marker resolve to [`Currency::HOME`].
    pub fn infer_from_label(label: &str) -> Currency {
        let label = label.to_lowercase();
        for (currency, markers) in CURRENCY_MARKERS {
            if markers.iter().any(|marker| label.contains(marker)) {
                return *currency;
            }
        }
        Currency::HOME
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TWD" => Ok(Currency::Twd),
            "USD" => Ok(Currency::Usd),
            "CNY" => Ok(Currency::Cny),
            "JPY" => Ok(Currency::Jpy),
            "EUR" => Ok(Currency::Eur),
            "ZAR" => Ok(Currency::Zar),
            "AUD" => Ok(Currency::Aud),
            _ => Err(anyhow::anyhow!("Unsupported currency code: {}", s)),
        }
    }
}

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteSource {
    PrimaryScrape,
    QuoteApi,
    Manual,
}

/// A resolved NAV observation. Immutable once produced; a newer quote for the
/// same code supersedes this one at the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavQuote {
    pub code: String,
    pub name: String,
    pub value: Decimal,
    pub currency: Currency,
    pub fetched_at: DateTime<Utc>,
    pub source: QuoteSource,
}

impl NavQuote {
    /// Builds a quote for a hand-entered NAV value.
    pub fn manual(code: &str, name: &str, value: Decimal, currency: Currency) -> Self {
        NavQuote {
            code: code.to_string(),
            name: name.to_string(),
            value,
            currency,
            fetched_at: Utc::now(),
            source: QuoteSource::Manual,
        }
    }
}

/// Extracts the numeric NAV from a scraped label.
///
/// Every character that is not an ASCII digit or a decimal point is stripped
/// before parsing, so labels like `"NT$123.456"` resolve to `123.456`. Returns
/// `None` when nothing numeric remains or the remainder is not a valid
/// decimal.
pub fn parse_nav_label(label: &str) -> Option<Decimal> {
    let digits: String = label
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return None;
    }

    Decimal::from_str(&digits).ok()
}
