//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::WalSyncStrategy;
use crate::error::{DiscountError, Result};
use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    file: File,
    len: u64,
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    unsynced: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// LSNs continue after the last valid entry. Run
    /// [`WalRecovery::recover`] first so a partial tail is not appended to.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let current_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn
        } else {
            0
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        let len = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            file,
            len,
            current_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append an entry to the WAL
    ///
    /// Returns the LSN assigned to the entry. A failed write is cut back
    /// off the file so the log never holds a half-written record.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.current_lsn + 1;
        let bytes = WalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.file.write_all(&bytes) {
            self.rollback_tail();
            return Err(DiscountError::WalWrite(format!("append lsn {}: {}", lsn, e)));
        }

        self.unsynced += 1;
        let needs_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if needs_sync {
            if let Err(e) = self.sync() {
                self.rollback_tail();
                return Err(e);
            }
        }

        self.len += bytes.len() as u64;
        self.current_lsn = lsn;
        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .map_err(|e| DiscountError::WalWrite(format!("sync: {}", e)))?;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    fn rollback_tail(&mut self) {
        let restored = self
            .file
            .set_len(self.len)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.len)).map(|_| ()));
        if let Err(e) = restored {
            tracing::error!("Failed to cut partial WAL record at offset {}: {}", self.len, e);
        }
    }
}
