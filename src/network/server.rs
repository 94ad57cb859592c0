//! TCP Server
//!
//! Accepts connections and runs each on its own handler thread.
//!
//! ## Shutdown
//! 1. [`ShutdownHandle::shutdown`] raises the flag and wakes the blocked
//!    accept with a loopback connection
//! 2. The read half of every live connection is shut down, so handlers
//!    blocked waiting for a request see end-of-stream
//! 3. [`Server::run`] waits up to the grace period for handlers to finish
//!    their in-flight request, then returns

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;
use super::Connection;

/// State shared between the accept loop, handlers and shutdown handles
struct Shared {
    shutdown: AtomicBool,
    local_addr: SocketAddr,

    /// Second handle to every live connection, for shutting down reads
    connections: Mutex<HashMap<u64, TcpStream>>,
}

/// TCP server for the discount protocol
pub struct Server {
    config: Config,
    registry: Arc<Registry>,
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Server {
    /// Bind the configured listen address
    pub fn bind(config: Config, registry: Arc<Registry>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        tracing::info!("TCP Server listening on {}", local_addr);

        Ok(Self {
            config,
            registry,
            listener,
            shared: Arc::new(Shared {
                shutdown: AtomicBool::new(false),
                local_addr,
                connections: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Accept connections until shutdown, then drain handlers (blocking)
    pub fn run(self) -> Result<()> {
        let (done_tx, done_rx) = channel::unbounded::<()>();
        let mut next_id: u64 = 0;
        let mut backoff = AcceptBackoff::new();

        for stream in self.listener.incoming() {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => {
                    backoff.reset();
                    next_id += 1;
                    self.spawn_handler(next_id, stream, done_tx.clone());
                }
                Err(e) => {
                    // Persistent errors such as EMFILE would otherwise spin this loop
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        "Failed to accept connection ({} in a row), retrying in {:?}: {}",
                        backoff.failures(),
                        delay,
                        e
                    );
                    thread::sleep(delay);
                }
            }
        }

        let Server {
            config,
            listener,
            shared,
            ..
        } = self;
        drop(listener);
        drop(done_tx);
        tracing::info!("TCP Server stopped accepting connections");

        Self::drain(&shared, Duration::from_millis(config.shutdown_grace_ms), done_rx);
        tracing::info!("TCP Server stopped");
        Ok(())
    }

    fn spawn_handler(&self, id: u64, stream: TcpStream, done: Sender<()>) {
        let tracked = match stream.try_clone() {
            Ok(tracked) => tracked,
            Err(e) => {
                tracing::warn!("Dropping connection {}: {}", id, e);
                return;
            }
        };

        {
            let mut connections = self.shared.connections.lock();
            if self.shared.shutdown.load(Ordering::SeqCst) {
                return;
            }
            if connections.len() >= self.config.max_connections {
                tracing::warn!(
                    "Connection limit ({}) reached, refusing {:?}",
                    self.config.max_connections,
                    stream.peer_addr().ok()
                );
                return;
            }
            connections.insert(id, tracked);
        }

        let guard = HandlerGuard {
            id,
            shared: Arc::clone(&self.shared),
            _done: done,
        };
        let registry = Arc::clone(&self.registry);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("discount-conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, registry).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::error!("Error handling TCP connection {}: {}", id, e);
                }
            });

        // The closure (and the guard inside it) is dropped on failure
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn handler for connection {}: {}", id, e);
        }
    }

    fn drain(shared: &Shared, grace: Duration, done_rx: Receiver<()>) {
        let live = shared.connections.lock().len();
        if live == 0 {
            return;
        }

        tracing::info!("Waiting up to {:?} for {} connections to finish", grace, live);

        let deadline = Instant::now() + grace;
        loop {
            match done_rx.recv_deadline(deadline) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Grace period elapsed with {} connections still open",
                        shared.connections.lock().len()
                    );
                    return;
                }
            }
        }
    }
}

/// Deregisters a connection when its handler thread ends, even by panic
struct HandlerGuard {
    id: u64,
    shared: Arc<Shared>,
    _done: Sender<()>,
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.shared.connections.lock().remove(&self.id);
    }
}

/// Cloneable handle that stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    shared: Arc<Shared>,
}

impl ShutdownHandle {
    /// Stop accepting and unblock handlers waiting for a request
    ///
    /// Idempotent; returns immediately. [`Server::run`] returns once the
    /// handlers finish or the grace period runs out.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("TCP Server stopping due to shutdown request");

        for (id, stream) in self.shared.connections.lock().iter() {
            if let Err(e) = stream.shutdown(Shutdown::Read) {
                tracing::debug!("Shutdown of connection {} read half failed: {}", id, e);
            }
        }

        // Wake the accept loop so it observes the flag
        let wake = wake_addr(self.shared.local_addr);
        if let Err(e) = TcpStream::connect_timeout(&wake, Duration::from_secs(1)) {
            tracing::debug!("Could not wake accept loop at {}: {}", wake, e);
        }
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }
}

/// Delay policy for consecutive accept failures
///
/// Doubles from 5ms up to 1s; any successful accept resets it.
#[derive(Debug, Default)]
pub struct AcceptBackoff {
    failures: u32,
}

impl AcceptBackoff {
    const BASE: Duration = Duration::from_millis(5);
    const MAX: Duration = Duration::from_secs(1);

    /// No failures recorded yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return how long to wait before retrying
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let shift = (self.failures - 1).min(16);
        (Self::BASE * (1u32 << shift)).min(Self::MAX)
    }

    /// Forget earlier failures
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Failures since the last reset
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Connectable address for the listener (unspecified IPs map to loopback)
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
