//! Configuration for the discount server
//!
//! Centralized configuration with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{DiscountError, Result};

/// Default TCP port the server listens on
pub const DEFAULT_PORT: u16 = 8080;

/// Main configuration for a discount server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Which code store backs the registry
    pub store_backend: StoreBackend,

    /// Root directory for data files (WAL backend only)
    /// Internal structure:
    ///   {data_dir}/
    ///     └── codes.wal        (write-ahead log of issued/redeemed codes)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables it)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables it)
    pub write_timeout_ms: u64,

    /// How long live connections get to finish after shutdown (milliseconds)
    pub shutdown_grace_ms: u64,
}

/// Code store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Volatile in-process store
    Memory,

    /// Durable store backed by a write-ahead log under `data_dir`
    Wal,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Wal,
            data_dir: PathBuf::from("./discount_data"),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            shutdown_grace_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        self.listen_addr.parse::<SocketAddr>().map_err(|e| {
            DiscountError::Config(format!("invalid listen address '{}': {}", self.listen_addr, e))
        })?;

        if self.max_connections == 0 {
            return Err(DiscountError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(DiscountError::Config(
                "WAL sync interval must be at least 1 entry".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the WAL file inside `data_dir`
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("codes.wal")
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store backend
    pub fn store_backend(mut self, backend: StoreBackend) -> Self {
        self.config.store_backend = backend;
        self
    }

    /// Set the data directory (WAL backend)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Listen on all interfaces at the given port
    pub fn port(mut self, port: u16) -> Self {
        self.config.listen_addr = format!("0.0.0.0:{}", port);
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the shutdown grace period (in milliseconds)
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
