//! # discountd
//!
//! A TCP server that issues and redeems single-use discount codes:
//! - Batch generation of codes unique across the server's lifetime
//! - At-most-once redemption under concurrent use
//! - Fixed-layout binary protocol over long-lived connections
//! - Write-Ahead Logging (WAL) for durable codes and usage state
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │             (one handler thread per client)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  decode / encode
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Registry                                │
//! │   generation lock (uniqueness)  │  striped redemption locks  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Generator  │          │  CodeStore  │
//!   │   (rand)    │          │ (mem / WAL) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod code;
pub mod wal;
pub mod store;
pub mod registry;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DiscountError, Result};
pub use config::Config;
pub use code::{CodeGenerator, DiscountCode, RedeemOutcome};
pub use registry::{GeneratedBatch, Registry};
pub use store::CodeStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the discount server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
