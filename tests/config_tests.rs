//! Tests for Config
//!
//! These tests verify:
//! - Defaults (port 8080, WAL backend)
//! - Builder setters
//! - Validation of unusable values

use discountd::config::{Config, StoreBackend, WalSyncStrategy};
use discountd::DiscountError;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.listen_addr, "0.0.0.0:8080");
    assert_eq!(config.store_backend, StoreBackend::Wal);
    assert_eq!(config.wal_sync_strategy, WalSyncStrategy::EveryWrite);
    assert_eq!(config.shutdown_grace_ms, 30_000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_builder_port_shortcut() {
    let config = Config::builder().port(9090).build();
    assert_eq!(config.listen_addr, "0.0.0.0:9090");
}

#[test]
fn test_builder_setters() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .store_backend(StoreBackend::Memory)
        .data_dir("/tmp/discount")
        .max_connections(4)
        .read_timeout_ms(100)
        .write_timeout_ms(200)
        .shutdown_grace_ms(300)
        .build();

    assert_eq!(config.listen_addr, "127.0.0.1:0");
    assert_eq!(config.store_backend, StoreBackend::Memory);
    assert_eq!(config.wal_path(), std::path::Path::new("/tmp/discount/codes.wal"));
    assert_eq!(config.max_connections, 4);
    assert_eq!(config.read_timeout_ms, 100);
    assert_eq!(config.write_timeout_ms, 200);
    assert_eq!(config.shutdown_grace_ms, 300);
}

#[test]
fn test_validate_rejects_bad_listen_addr() {
    let config = Config::builder().listen_addr("not-an-addr").build();
    assert!(matches!(config.validate(), Err(DiscountError::Config(_))));
}

#[test]
fn test_validate_rejects_zero_connections() {
    let config = Config::builder().max_connections(0).build();
    assert!(matches!(config.validate(), Err(DiscountError::Config(_))));
}

#[test]
fn test_validate_rejects_zero_sync_interval() {
    let config = Config::builder()
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 0 })
        .build();
    assert!(matches!(config.validate(), Err(DiscountError::Config(_))));
}
