//! Store Module
//!
//! Persistence for issued discount codes.
//!
//! ## Backends
//! - [`MemoryStore`]: volatile, process lifetime only
//! - [`WalStore`]: durable, one WAL record per committed operation
//!
//! Every operation commits atomically: either all of its effects are
//! visible afterwards or none are.

mod memory;
mod wal_store;

pub use memory::MemoryStore;
pub use wal_store::WalStore;

use std::sync::Arc;

use crate::code::DiscountCode;
use crate::config::{Config, StoreBackend};
use crate::error::Result;

/// Persistence interface consumed by the registry
pub trait CodeStore: Send + Sync {
    /// Every code ever stored, used to seed the uniqueness set
    fn load_all_codes(&self) -> Result<Vec<String>>;

    /// Store a batch of new codes, all or nothing
    ///
    /// Fails with `DuplicateCode` if any code is already stored or appears
    /// twice in `codes`.
    fn append_codes(&self, codes: &[DiscountCode]) -> Result<()>;

    /// Look up a code by exact match
    fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>>;

    /// Replace the usage state of an existing code
    ///
    /// Fails with `CodeNotFound` if the code was never stored.
    fn update_usage(&self, code: &DiscountCode) -> Result<()>;
}

/// Open the store selected by `config`
pub fn open_store(config: &Config) -> Result<Arc<dyn CodeStore>> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Wal => {
            std::fs::create_dir_all(&config.data_dir)?;
            Ok(Arc::new(WalStore::open(&config.wal_path(), config.wal_sync_strategy)?))
        }
    }
}
