//! Response definitions
//!
//! Represents responses to clients.

use crate::code::RedeemOutcome;

/// Single-byte frame sent for an unknown opcode
pub const UNKNOWN_REQUEST_BYTE: u8 = 0xFF;

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Generate succeeded; codes in generation order
    Generated { codes: Vec<String> },

    /// Generate failed (validation, short batch or store failure)
    GenerateFailed,

    /// Result of a use-code request
    UseCode(RedeemOutcome),

    /// The opcode was not recognised
    UnknownRequest,
}

impl Response {
    /// Create a successful generate response
    pub fn generated(codes: Vec<String>) -> Self {
        Response::Generated { codes }
    }

    /// Create a failed generate response
    pub fn generate_failed() -> Self {
        Response::GenerateFailed
    }

    /// Create a use-code response
    pub fn use_code(outcome: RedeemOutcome) -> Self {
        Response::UseCode(outcome)
    }
}
