//! Code Module
//!
//! Discount code records and the symbol set they are drawn from.
//!
//! ## Alphabet
//! 32 symbols: uppercase letters and digits without the visually
//! ambiguous `0`, `1`, `I` and `O`.
//!
//! ```text
//! ABCDEFGHJKLMNPQRSTUVWXYZ23456789
//! ```

mod generator;

pub use generator::CodeGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Symbols a code may contain
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Shortest valid code length
pub const MIN_CODE_LENGTH: usize = 7;

/// Longest valid code length (also the fixed width of a code on the wire)
pub const MAX_CODE_LENGTH: usize = 8;

/// Largest batch a single generate request may ask for
pub const MAX_BATCH_SIZE: u16 = 2000;

/// Whether `length` is a code length the server issues and accepts
pub fn is_valid_length(length: usize) -> bool {
    (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length)
}

/// Whether every character of `code` belongs to [`ALPHABET`]
pub fn in_alphabet(code: &str) -> bool {
    code.bytes().all(|b| ALPHABET.contains(&b))
}

/// A single issued discount code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// The code text (7 or 8 alphabet symbols)
    pub code: String,

    /// Whether the code has been redeemed
    pub is_used: bool,

    /// When the code was generated
    pub generated_at: DateTime<Utc>,

    /// When the code was redeemed; `Some` iff `is_used`
    pub used_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    /// Create a fresh, unused code stamped with the current time
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            is_used: false,
            generated_at: Utc::now(),
            used_at: None,
        }
    }

    /// Return a copy of this record marked as redeemed at `at`
    pub fn redeemed(&self, at: DateTime<Utc>) -> Self {
        Self {
            code: self.code.clone(),
            is_used: true,
            generated_at: self.generated_at,
            used_at: Some(at),
        }
    }
}

/// Outcome of a redemption attempt, numbered as on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RedeemOutcome {
    Success = 0x00,
    InvalidCode = 0x01,
    AlreadyUsed = 0x02,
    ServerError = 0x03,
}

impl RedeemOutcome {
    /// Parse a wire result byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(RedeemOutcome::Success),
            0x01 => Some(RedeemOutcome::InvalidCode),
            0x02 => Some(RedeemOutcome::AlreadyUsed),
            0x03 => Some(RedeemOutcome::ServerError),
            _ => None,
        }
    }
}
