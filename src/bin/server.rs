//! Discount Server Binary
//!
//! Starts the TCP server for discount codes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use discountd::config::{StoreBackend, WalSyncStrategy};
use discountd::network::Server;
use discountd::{Config, Registry};
use tracing_subscriber::{fmt, EnvFilter};

/// Discount Server
#[derive(Parser, Debug)]
#[command(name = "discount-server")]
#[command(about = "Issues and redeems single-use discount codes over TCP")]
#[command(version)]
struct Args {
    /// TCP port to listen on (all interfaces)
    #[arg(short, long, env = "DISCOUNT_PORT", default_value_t = discountd::config::DEFAULT_PORT)]
    port: u16,

    /// Full listen address (host:port); overrides --port
    #[arg(short, long, env = "DISCOUNT_LISTEN")]
    listen: Option<String>,

    /// Code store backend
    #[arg(long, value_enum, env = "DISCOUNT_STORE", default_value = "wal")]
    store: Backend,

    /// Data directory (WAL backend)
    #[arg(short, long, env = "DISCOUNT_DATA_DIR", default_value = "./discount_data")]
    data_dir: PathBuf,

    /// fsync the WAL every N records instead of after every record
    #[arg(long)]
    sync_every: Option<usize>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Close connections idle for this many milliseconds (0 = never)
    #[arg(long, default_value = "0")]
    idle_timeout_ms: u64,

    /// Seconds to let open connections finish on shutdown
    #[arg(long, default_value = "30")]
    shutdown_grace_secs: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Memory,
    Wal,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,discountd=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Discount Server v{}", discountd::VERSION);

    let mut builder = Config::builder()
        .port(args.port)
        .data_dir(&args.data_dir)
        .store_backend(match args.store {
            Backend::Memory => StoreBackend::Memory,
            Backend::Wal => StoreBackend::Wal,
        })
        .max_connections(args.max_connections)
        .read_timeout_ms(args.idle_timeout_ms)
        .shutdown_grace_ms(args.shutdown_grace_secs * 1000);
    if let Some(listen) = args.listen {
        builder = builder.listen_addr(listen);
    }
    if let Some(count) = args.sync_every {
        builder = builder.wal_sync_strategy(WalSyncStrategy::EveryNEntries { count });
    }
    let config = builder.build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return ExitCode::FAILURE;
    }
    if config.store_backend == StoreBackend::Wal {
        tracing::info!("Data directory: {}", config.data_dir.display());
    }

    let registry = match Registry::open(&config) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            tracing::error!("Failed to open code registry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(config, registry) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
