//! In-memory asset store
//!
//! Backs the CLI and tests. The host application substitutes its relational
//! database behind the same [`AssetStore`] trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::core::config::AssetEntry;
use crate::core::store::{AssetStore, SyncAsset};

#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub id: i64,
    pub code: String,
    pub name: Option<String>,
    pub nav: Option<Decimal>,
    pub last_synced: Option<DateTime<Utc>>,
}

pub struct MemoryAssetStore {
    rows: Mutex<Vec<AssetRecord>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        MemoryAssetStore {
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Seeds one row per configured asset, ids assigned in order.
    pub fn from_entries(entries: &[AssetEntry]) -> Self {
        let rows = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| AssetRecord {
                id: index as i64 + 1,
                code: entry.code.clone(),
                name: entry.name.clone(),
                nav: None,
                last_synced: None,
            })
            .collect();

        MemoryAssetStore {
            rows: Mutex::new(rows),
        }
    }

    pub async fn snapshot(&self) -> Vec<AssetRecord> {
        self.rows.lock().await.clone()
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        MemoryAssetStore::new()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn list_sync_assets(&self) -> Result<Vec<SyncAsset>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| !row.code.is_empty())
            .map(|row| SyncAsset {
                id: row.id,
                code: row.code.clone(),
                name: row.name.clone(),
            })
            .collect())
    }

    async fn update_nav_value(&self, id: i64, value: Decimal) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| anyhow::anyhow!("No asset with id {}", id))?;
        row.nav = Some(value);
        Ok(())
    }

    async fn update_last_synced(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| anyhow::anyhow!("No asset with id {}", id))?;
        row.last_synced = Some(at);
        Ok(())
    }
}
