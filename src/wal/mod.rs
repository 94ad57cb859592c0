//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for the code store through append-only logging.
//!
//! ## Responsibilities
//! - Append one record per committed store operation
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │ Entry 1                                           │
//! │ ┌─────────┬─────────┬─────────┬──────────┬──────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ HCRC (4) │ Data │ │
//! │ └─────────┴─────────┴─────────┴──────────┴──────┘ │
//! ├───────────────────────────────────────────────────┤
//! │ Entry 2                                           │
//! │ ┌─────────┬─────────┬─────────┬──────────┬──────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ HCRC (4) │ Data │ │
//! │ └─────────┴─────────┴─────────┴──────────┴──────┘ │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! All header integers are little-endian. `CRC` covers `Data`; `HCRC`
//! covers the 16 header bytes before it. A record whose bytes are not
//! fully on disk is not committed.
//!
//! Recovery skips records with a bad `CRC` and cuts off a torn final
//! record. A bad `HCRC` is a hard error: the length cannot be trusted,
//! so nothing after it can be located.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE, MAX_ENTRY_SIZE};
pub use writer::WalWriter;
pub use reader::{WalReader, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};
