//! Core domain types and collaborator seams

pub mod config;
pub mod log;
pub mod quote;
pub mod store;
pub mod task;

// Re-export main types for cleaner imports
pub use quote::{Currency, NavQuote, QuoteSource};
pub use store::{AssetStore, SyncAsset};
pub use task::{NAV_UPDATE_TASK, TaskRunRecord, TaskStatus};
