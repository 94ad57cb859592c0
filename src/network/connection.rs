//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DiscountError, Result};
use crate::protocol::{read_request, write_response, Request, Response};
use crate::registry::Registry;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared code registry
    registry: Arc<Registry>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on two handles to the same socket
    pub fn new(stream: TcpStream, registry: Arc<Registry>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Responses are small; don't let Nagle hold them back
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            registry,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a timeout disabled)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads one request at a time and writes exactly one response for it.
    /// Returns when the client disconnects, the read half is shut down by
    /// the server, or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::info!("TCP Client connected: {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::info!("TCP Client disconnected: {}", self.peer_addr);
                    return Ok(());
                }
                Err(DiscountError::Io(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    // Incomplete frame; no response is owed
                    tracing::debug!("Client {} closed mid-request", self.peer_addr);
                    return Ok(());
                }
                Err(DiscountError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} dropped: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(DiscountError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // WouldBlock on Unix, TimedOut on Windows
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

            let response = self.dispatch(request);

            if let Err(e) = self.send_response(&response) {
                if let DiscountError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Run a request against the registry and build its response
    fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Generate { count, length } => {
                match self.registry.generate_batch(count, length) {
                    Ok(batch) if batch.is_complete() => {
                        Response::generated(batch.codes.into_iter().map(|c| c.code).collect())
                    }
                    Ok(_) => Response::generate_failed(),
                    Err(e) => {
                        tracing::debug!("Generate request from {} failed: {}", self.peer_addr, e);
                        Response::generate_failed()
                    }
                }
            }
            Request::UseCode { code } => Response::use_code(self.registry.redeem(&code)),
            Request::Unknown(opcode) => {
                tracing::warn!("Unknown request type 0x{:02x} from {}", opcode, self.peer_addr);
                Response::UnknownRequest
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
