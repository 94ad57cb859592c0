//! Tests for the WAL
//!
//! These tests verify:
//! - Entry framing (header layout, CRC, LSN)
//! - Writer LSN assignment and continuation after reopen
//! - Recovery from a clean WAL, a partial tail and corrupted entries
//! - A damaged header fails recovery instead of truncating what follows
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use discountd::config::WalSyncStrategy;
use discountd::wal::{Operation, WalEntry, WalReader, WalRecovery, WalWriter, HEADER_SIZE};
use discountd::{DiscountCode, DiscountError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn issue(codes: &[&str]) -> Operation {
    Operation::Issue {
        codes: codes.iter().map(|c| DiscountCode::new(*c)).collect(),
    }
}

/// Write `count` single-code issue entries using WalWriter
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(issue(&[format!("CODE{:03}", i).as_str()])).unwrap();
    }
}

fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Entry Tests
// =============================================================================

#[test]
fn test_entry_serialize_deserialize() {
    let entry = WalEntry::new(7, issue(&["ABCDEFG", "HJKLMNPQ"]));
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &7u64.to_le_bytes());
    let len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);

    let decoded = WalEntry::deserialize(&bytes).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn test_entry_detects_crc_mismatch() {
    let entry = WalEntry::new(1, issue(&["ABCDEFG"]));
    let mut bytes = entry.serialize().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(DiscountError::WalCorruption(_))
    ));
}

#[test]
fn test_entry_detects_header_damage() {
    let mut bytes = WalEntry::new(1, issue(&["ABCDEFG"])).serialize().unwrap();
    // Low bit of the length field
    bytes[12] ^= 0x01;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(DiscountError::WalCorruption(_))
    ));
}

#[test]
fn test_entry_detects_incomplete_bytes() {
    let bytes = WalEntry::new(1, issue(&["ABCDEFG"])).serialize().unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]).is_err());
    assert!(WalEntry::deserialize(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn test_redeem_entry_round_trip() {
    let used_at = Utc::now();
    let entry = WalEntry::new(
        3,
        Operation::Redeem {
            code: "ABCDEFG".to_string(),
            used_at,
        },
    );
    let decoded = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();
    assert_eq!(decoded, entry);
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_writer_assigns_sequential_lsns() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.current_lsn(), 0);
    assert_eq!(writer.append(issue(&["AAAAAAA"])).unwrap(), 1);
    assert_eq!(writer.append(issue(&["BBBBBBB"])).unwrap(), 2);
    assert_eq!(writer.current_lsn(), 2);
}

#[test]
fn test_writer_continues_lsn_after_reopen() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 3);
    assert_eq!(writer.append(issue(&["DDDDDDD"])).unwrap(), 4);
}

#[test]
fn test_batched_sync_strategy_still_persists() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer =
            WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 10 }).unwrap();
        for i in 0..3 {
            writer.append(issue(&[format!("SYNC{:03}", i).as_str()])).unwrap();
        }
        writer.sync().unwrap();
    }

    let (entries, _) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 3);
}

#[test]
fn test_reader_iterates_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let lsns: Vec<u64> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect();
    assert_eq!(lsns, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_reader_reports_partial_tail_as_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 1);
    append_bytes(&wal_path, &[1, 2, 3]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(matches!(reader.next_entry(), Err(DiscountError::WalCorruption(_))));
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 4);
    assert_eq!(result.entries_recovered, 4);
    assert_eq!(result.last_lsn, 4);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_truncates_partial_write() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    // Half of a third entry
    let partial = WalEntry::new(3, issue(&["PARTIAL"])).serialize().unwrap();
    append_bytes(&wal_path, &partial[..partial.len() / 2]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert!(result.was_truncated);
    assert_eq!(result.last_lsn, 2);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_recover_skips_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut bytes = Vec::new();
    for (lsn, code) in [(1, "AAAAAAA"), (2, "BBBBBBB"), (3, "CCCCCCC")] {
        let mut frame = WalEntry::new(lsn, issue(&[code])).serialize().unwrap();
        if lsn == 2 {
            let last = frame.len() - 1;
            frame[last] ^= 0xFF;
        }
        bytes.extend_from_slice(&frame);
    }
    fs::write(&wal_path, &bytes).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.iter().map(|e| e.lsn).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 3);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_refuses_damaged_header_without_truncating() {
    let (_temp, wal_path) = setup_temp_wal();

    let frames: Vec<Vec<u8>> = vec![
        WalEntry::new(1, issue(&["AAAAAAA"])).serialize().unwrap(),
        WalEntry::new(2, issue(&["BBBBBBB"])).serialize().unwrap(),
        WalEntry::new(
            3,
            Operation::Redeem {
                code: "AAAAAAA".to_string(),
                used_at: Utc::now(),
            },
        )
        .serialize()
        .unwrap(),
    ];
    let mut bytes = frames.concat();
    // Flip a bit in the middle frame's length field
    bytes[frames[0].len() + 15] ^= 0x01;
    fs::write(&wal_path, &bytes).unwrap();
    let len_before = fs::metadata(&wal_path).unwrap().len();

    assert!(matches!(
        WalRecovery::recover(&wal_path),
        Err(DiscountError::WalCorruption(_))
    ));
    assert!(matches!(
        WalRecovery::verify(&wal_path),
        Err(DiscountError::WalCorruption(_))
    ));
    assert!(WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).is_err());

    // Nothing after the damaged frame was cut off
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
    assert_eq!(fs::read(&wal_path).unwrap(), bytes);
}

#[test]
fn test_recover_truncates_torn_header() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    let next = WalEntry::new(3, issue(&["TORNHDR"])).serialize().unwrap();
    append_bytes(&wal_path, &next[..HEADER_SIZE - 1]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert!(result.was_truncated);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    append_bytes(&wal_path, &[0xAB; 5]);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_append_after_recovery_is_readable() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    append_bytes(&wal_path, &[0x00; 7]);

    WalRecovery::recover(&wal_path).unwrap();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.append(issue(&["AFTER23"])).unwrap(), 3);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(!result.was_truncated);
}
