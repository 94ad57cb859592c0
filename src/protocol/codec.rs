//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Requests
//! ```text
//! Generate:  ┌──────┬───────────────┬────────────┐
//!            │ 0x01 │ count (2, LE) │ length (1) │
//!            └──────┴───────────────┴────────────┘
//! Use code:  ┌──────┬──────────────────────────────┐
//!            │ 0x02 │ code (8, space-padded UTF-8) │
//!            └──────┴──────────────────────────────┘
//! ```
//!
//! ### Responses
//! ```text
//! Generate:  0x01 0x00                      (failure)
//!            0x01 0x01 + count x code (8)   (success)
//! Use code:  0x02 result (1)
//! Unknown:   0xFF
//! ```
//!
//! Frames have no length prefix: the opcode alone fixes the layout.

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::code::{RedeemOutcome, MAX_CODE_LENGTH};
use crate::error::{DiscountError, Result};
use super::{Opcode, Request, Response, UNKNOWN_REQUEST_BYTE};

/// Payload size of a generate request: count (2) + length (1)
pub const GENERATE_PAYLOAD_SIZE: usize = 3;

/// Width of a code on the wire
pub const CODE_WIDTH: usize = MAX_CODE_LENGTH;

/// Payload size of a use-code request
pub const USE_CODE_PAYLOAD_SIZE: usize = CODE_WIDTH;

const RESULT_FAILURE: u8 = 0x00;
const RESULT_SUCCESS: u8 = 0x01;

// =============================================================================
// Code Padding
// =============================================================================

/// Right-pad a code with spaces to the fixed wire width
///
/// Codes longer than the width are cut at the last character boundary
/// that fits, so the padded bytes are always valid UTF-8.
pub fn pad_code(code: &str) -> [u8; CODE_WIDTH] {
    let mut padded = [b' '; CODE_WIDTH];
    let mut len = code.len().min(CODE_WIDTH);
    while !code.is_char_boundary(len) {
        len -= 1;
    }
    padded[..len].copy_from_slice(&code.as_bytes()[..len]);
    padded
}

/// Decode a padded wire code, stripping surrounding whitespace
pub fn unpad_code(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + USE_CODE_PAYLOAD_SIZE);
    buf.put_u8(request.opcode_byte());

    match request {
        Request::Generate { count, length } => {
            buf.put_u16_le(*count);
            buf.put_u8(*length);
        }
        Request::UseCode { code } => buf.put_slice(&pad_code(code)),
        Request::Unknown(_) => {}
    }

    buf.freeze()
}

/// Decode a complete request frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let mut buf = bytes;
    if !buf.has_remaining() {
        return Err(DiscountError::Protocol("Empty request frame".to_string()));
    }

    let opcode = buf.get_u8();
    let expected = match Opcode::from_byte(opcode) {
        Some(Opcode::Generate) => GENERATE_PAYLOAD_SIZE,
        Some(Opcode::UseCode) => USE_CODE_PAYLOAD_SIZE,
        None => 0,
    };

    if buf.remaining() != expected {
        return Err(DiscountError::Protocol(format!(
            "Request 0x{:02x}: expected {} payload bytes, got {}",
            opcode,
            expected,
            buf.remaining()
        )));
    }

    Ok(decode_payload(opcode, buf))
}

/// Build a request from its opcode and exactly-sized payload
fn decode_payload(opcode: u8, mut payload: &[u8]) -> Request {
    match Opcode::from_byte(opcode) {
        Some(Opcode::Generate) => Request::Generate {
            count: payload.get_u16_le(),
            length: payload.get_u8(),
        },
        Some(Opcode::UseCode) => Request::UseCode {
            code: unpad_code(payload),
        },
        None => Request::Unknown(opcode),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Bytes {
    match response {
        Response::Generated { codes } => {
            let mut buf = BytesMut::with_capacity(2 + codes.len() * CODE_WIDTH);
            buf.put_u8(Opcode::Generate as u8);
            buf.put_u8(RESULT_SUCCESS);
            for code in codes {
                buf.put_slice(&pad_code(code));
            }
            buf.freeze()
        }
        Response::GenerateFailed => {
            Bytes::from_static(&[Opcode::Generate as u8, RESULT_FAILURE])
        }
        Response::UseCode(outcome) => Bytes::from(vec![Opcode::UseCode as u8, *outcome as u8]),
        Response::UnknownRequest => Bytes::from_static(&[UNKNOWN_REQUEST_BYTE]),
    }
}

/// Decode a complete response frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut buf = bytes;
    if !buf.has_remaining() {
        return Err(DiscountError::Protocol("Empty response frame".to_string()));
    }

    match buf.get_u8() {
        UNKNOWN_REQUEST_BYTE if !buf.has_remaining() => Ok(Response::UnknownRequest),
        0x01 if buf.remaining() >= 1 => {
            let result = buf.get_u8();
            match result {
                RESULT_FAILURE if !buf.has_remaining() => Ok(Response::GenerateFailed),
                RESULT_SUCCESS if buf.remaining() % CODE_WIDTH == 0 => Ok(Response::Generated {
                    codes: buf.chunks(CODE_WIDTH).map(unpad_code).collect(),
                }),
                _ => Err(DiscountError::Protocol(format!(
                    "Malformed generate response: result 0x{:02x}, {} trailing bytes",
                    result,
                    buf.remaining()
                ))),
            }
        }
        0x02 if buf.remaining() == 1 => {
            let byte = buf.get_u8();
            RedeemOutcome::from_byte(byte)
                .map(Response::UseCode)
                .ok_or_else(|| {
                    DiscountError::Protocol(format!("Unknown use-code result: 0x{:02x}", byte))
                })
        }
        other => Err(DiscountError::Protocol(format!(
            "Malformed response frame starting 0x{:02x} ({} bytes)",
            other,
            bytes.len()
        ))),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a stream
///
/// Returns `Ok(None)` if the stream ends before an opcode arrives. A
/// stream that ends inside a payload yields an `UnexpectedEof` I/O error.
/// Partial reads are accumulated until the fixed frame is complete.
pub fn read_request<R: Read>(reader: &mut R) -> Result<Option<Request>> {
    let opcode = match read_byte(reader)? {
        Some(byte) => byte,
        None => return Ok(None),
    };

    let request = match Opcode::from_byte(opcode) {
        Some(Opcode::Generate) => {
            let mut payload = [0u8; GENERATE_PAYLOAD_SIZE];
            reader.read_exact(&mut payload)?;
            decode_payload(opcode, &payload)
        }
        Some(Opcode::UseCode) => {
            let mut payload = [0u8; USE_CODE_PAYLOAD_SIZE];
            reader.read_exact(&mut payload)?;
            decode_payload(opcode, &payload)
        }
        None => Request::Unknown(opcode),
    };

    Ok(Some(request))
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

/// Read the response to `request` from a stream
///
/// The request is needed because a successful generate response carries
/// no count of its own.
pub fn read_response<R: Read>(reader: &mut R, request: &Request) -> Result<Response> {
    let first = read_byte(reader)?.ok_or_else(|| {
        DiscountError::Network("Connection closed before response".to_string())
    })?;

    if first == UNKNOWN_REQUEST_BYTE {
        return Ok(Response::UnknownRequest);
    }

    let mut frame = vec![first, 0];
    reader.read_exact(&mut frame[1..])?;

    if let Request::Generate { count, .. } = request {
        if frame[..] == [Opcode::Generate as u8, RESULT_SUCCESS] {
            let mut codes = vec![0u8; usize::from(*count) * CODE_WIDTH];
            reader.read_exact(&mut codes)?;
            frame.extend_from_slice(&codes);
        }
    }

    decode_response(&frame)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

/// Read one byte, returning `None` at end of stream
fn read_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
