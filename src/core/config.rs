use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_QUOTE_API_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_FUND_PAGE_URL: &str = "https://www.fundrich.com.tw/2022OfficialWeb";

/// An asset whose NAV should be kept in sync from an external source.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetEntry {
    /// Ticker (e.g. "VT") or local-market fund code (e.g. "004205").
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QuoteApiConfig {
    pub base_url: String,
    /// Key for the quote API. Leaving it unset disables that source.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FundPageConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub quote_api: Option<QuoteApiConfig>,
    pub fund_page: Option<FundPageConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            quote_api: Some(QuoteApiConfig {
                base_url: DEFAULT_QUOTE_API_URL.to_string(),
                api_key: None,
            }),
            fund_page: Some(FundPageConfig {
                base_url: DEFAULT_FUND_PAGE_URL.to_string(),
            }),
        }
    }
}

fn default_quote_pace_ms() -> u64 {
    500
}

fn default_page_pace_ms() -> u64 {
    1000
}

/// Pacing between consecutive resolutions in one batch pass. Free-tier quota
/// limits on the external sources are the constraint here, not throughput.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_quote_pace_ms")]
    pub quote_pace_ms: u64,
    #[serde(default = "default_page_pace_ms")]
    pub page_pace_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            quote_pace_ms: default_quote_pace_ms(),
            page_pace_ms: default_page_pace_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "navsync", "navsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
