pub mod memory;

pub use memory::{AssetRecord, MemoryAssetStore};
