//! Protocol Module
//!
//! Defines the fixed-layout binary protocol between clients and the server.
//!
//! ## Requests
//! - 0x01: GENERATE - Payload: count (u16 LE) + length (u8)
//! - 0x02: USE_CODE - Payload: code (8 bytes, space-padded)
//! - other: no payload, answered with a single 0xFF byte
//!
//! ## Responses
//! - GENERATE: 0x01 + result (0x00 failure / 0x01 success) + codes
//! - USE_CODE: 0x02 + result
//!
//! ### Use-code Results
//! - 0x00: SUCCESS
//! - 0x01: INVALID_CODE
//! - 0x02: ALREADY_USED
//! - 0x03: SERVER_ERROR

mod request;
mod response;
mod codec;

pub use request::{Opcode, Request};
pub use response::{Response, UNKNOWN_REQUEST_BYTE};
pub use codec::{
    encode_request, decode_request, encode_response, decode_response,
    read_request, write_request, read_response, write_response,
    pad_code, unpad_code,
    CODE_WIDTH, GENERATE_PAYLOAD_SIZE, USE_CODE_PAYLOAD_SIZE,
};
