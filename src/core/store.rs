//! Persistence collaborator seam
//!
//! The relational schema, sessions and permissions live in the host
//! application; this core only sees the minimal projection needed to drive a
//! sync pass and two idempotent write operations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Minimal projection of a persisted asset eligible for external sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAsset {
    pub id: i64,
    /// External source identifier: a ticker or a local-market fund code.
    pub code: String,
    pub name: Option<String>,
}

/// Data-access interface consumed by the sync engine.
///
/// Implementations must make both writes idempotent: re-applying the same NAV
/// value or timestamp for the same id is a no-op in effect. Retried task
/// attempts reprocess the full asset list and rely on this.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Lists every asset that has an external source code configured.
    async fn list_sync_assets(&self) -> Result<Vec<SyncAsset>>;

    async fn update_nav_value(&self, id: i64, value: Decimal) -> Result<()>;

    async fn update_last_synced(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
}
