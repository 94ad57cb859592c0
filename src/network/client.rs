//! Protocol Client
//!
//! Blocking client for the discount protocol, used by the CLI and tests.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::code::RedeemOutcome;
use crate::error::{DiscountError, Result};
use crate::protocol::{read_response, write_request, Request, Response};

/// A connection to a discount server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Limit how long a response may take (None waits forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a request and wait for its response
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        read_response(&mut self.reader, request)
    }

    /// Ask for `count` codes of `length` symbols
    ///
    /// Returns `None` when the server reports failure.
    pub fn generate(&mut self, count: u16, length: u8) -> Result<Option<Vec<String>>> {
        match self.request(&Request::Generate { count, length })? {
            Response::Generated { codes } => Ok(Some(codes)),
            Response::GenerateFailed => Ok(None),
            other => Err(unexpected(&other)),
        }
    }

    /// Try to redeem `code`
    pub fn use_code(&mut self, code: &str) -> Result<RedeemOutcome> {
        let request = Request::UseCode {
            code: code.to_string(),
        };
        match self.request(&request)? {
            Response::UseCode(outcome) => Ok(outcome),
            other => Err(unexpected(&other)),
        }
    }

    /// Write raw bytes to the server
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read exactly `len` raw bytes from the server
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read whatever remains until the server closes the connection
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

fn unexpected(response: &Response) -> DiscountError {
    DiscountError::Protocol(format!("Unexpected response: {:?}", response))
}
