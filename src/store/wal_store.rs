//! WAL-backed code store
//!
//! ## Concurrency Model
//!
//! - **Writes** (append/update): serialized by the WAL mutex.
//!   Order is always: WAL lock → validate → append record → index write lock
//! - **Reads** (find/load): index read lock only
//!
//! The index is only touched after the WAL record is on disk, so a failed
//! append leaves both the file and the index unchanged.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::{Mutex, RwLock};

use crate::code::DiscountCode;
use crate::config::WalSyncStrategy;
use crate::error::{DiscountError, Result};
use crate::wal::{Operation, WalRecovery, WalWriter};
use super::memory::check_new_batch;
use super::CodeStore;

/// Durable code store
pub struct WalStore {
    /// Append-only log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Current state of every stored code
    codes: RwLock<HashMap<String, DiscountCode>>,
}

impl WalStore {
    /// Open or create the store, replaying any existing WAL
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut codes = HashMap::new();

        if path.exists() {
            let (entries, recovery) = WalRecovery::recover(path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery.entries_recovered,
                    recovery.entries_corrupted,
                    recovery.last_lsn
                );
            }

            for entry in entries {
                Self::replay(&mut codes, entry.operation);
            }
        }

        let wal = WalWriter::open(path, sync_strategy)?;
        tracing::debug!("Opened WAL store at {} with {} codes", path.display(), codes.len());

        Ok(Self {
            wal: Mutex::new(wal),
            codes: RwLock::new(codes),
        })
    }

    /// Number of stored codes
    pub fn len(&self) -> usize {
        self.codes.read().len()
    }

    /// Check if the store holds no codes
    pub fn is_empty(&self) -> bool {
        self.codes.read().is_empty()
    }

    fn replay(codes: &mut HashMap<String, DiscountCode>, operation: Operation) {
        match operation {
            Operation::Issue { codes: batch } => {
                for record in batch {
                    if codes.contains_key(&record.code) {
                        tracing::warn!("WAL replay: code {} issued twice, keeping first", record.code);
                        continue;
                    }
                    codes.insert(record.code.clone(), record);
                }
            }
            Operation::Redeem { code, used_at } => match codes.get_mut(&code) {
                Some(record) => {
                    record.is_used = true;
                    record.used_at = Some(used_at);
                }
                None => tracing::warn!("WAL replay: redemption of unknown code {}", code),
            },
        }
    }
}

impl CodeStore for WalStore {
    fn load_all_codes(&self) -> Result<Vec<String>> {
        Ok(self.codes.read().keys().cloned().collect())
    }

    fn append_codes(&self, codes: &[DiscountCode]) -> Result<()> {
        let mut wal = self.wal.lock();
        check_new_batch(&self.codes.read(), codes)?;

        wal.append(Operation::Issue {
            codes: codes.to_vec(),
        })?;

        let mut map = self.codes.write();
        for record in codes {
            map.insert(record.code.clone(), record.clone());
        }
        Ok(())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>> {
        Ok(self.codes.read().get(code).cloned())
    }

    fn update_usage(&self, code: &DiscountCode) -> Result<()> {
        let used_at = match (code.is_used, code.used_at) {
            (true, Some(at)) => at,
            _ => {
                return Err(DiscountError::Store(format!(
                    "code {} can only be updated to a used state with a timestamp",
                    code.code
                )))
            }
        };

        let mut wal = self.wal.lock();
        if !self.codes.read().contains_key(&code.code) {
            return Err(DiscountError::CodeNotFound(code.code.clone()));
        }

        wal.append(Operation::Redeem {
            code: code.code.clone(),
            used_at,
        })?;

        if let Some(record) = self.codes.write().get_mut(&code.code) {
            record.is_used = true;
            record.used_at = Some(used_at);
        }
        Ok(())
    }
}
