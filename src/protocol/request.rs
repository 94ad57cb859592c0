//! Request definitions
//!
//! Represents requests from clients.

/// Request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Generate = 0x01,
    UseCode = 0x02,
}

impl Opcode {
    /// Map a wire byte to a known opcode
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Opcode::Generate),
            0x02 => Some(Opcode::UseCode),
            _ => None,
        }
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Generate `count` codes of `length` symbols
    Generate { count: u16, length: u8 },

    /// Redeem a code (already stripped of padding)
    UseCode { code: String },

    /// Any other opcode; carries no payload
    Unknown(u8),
}

impl Request {
    /// The first byte of this request on the wire
    pub fn opcode_byte(&self) -> u8 {
        match self {
            Request::Generate { .. } => Opcode::Generate as u8,
            Request::UseCode { .. } => Opcode::UseCode as u8,
            Request::Unknown(byte) => *byte,
        }
    }
}
