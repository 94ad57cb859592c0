//! In-memory code store
//!
//! HashMap keyed by code text behind a parking_lot RwLock.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::code::DiscountCode;
use crate::error::{DiscountError, Result};
use super::CodeStore;

/// Volatile code store
#[derive(Debug, Default)]
pub struct MemoryStore {
    codes: RwLock<HashMap<String, DiscountCode>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored codes
    pub fn len(&self) -> usize {
        self.codes.read().len()
    }

    /// Check if the store holds no codes
    pub fn is_empty(&self) -> bool {
        self.codes.read().is_empty()
    }
}

/// Reject a batch that repeats itself or collides with `existing`
pub(crate) fn check_new_batch(
    existing: &HashMap<String, DiscountCode>,
    codes: &[DiscountCode],
) -> Result<()> {
    let mut seen = HashSet::with_capacity(codes.len());
    for record in codes {
        if existing.contains_key(&record.code) || !seen.insert(record.code.as_str()) {
            return Err(DiscountError::DuplicateCode(record.code.clone()));
        }
    }
    Ok(())
}

impl CodeStore for MemoryStore {
    fn load_all_codes(&self) -> Result<Vec<String>> {
        Ok(self.codes.read().keys().cloned().collect())
    }

    fn append_codes(&self, codes: &[DiscountCode]) -> Result<()> {
        let mut map = self.codes.write();
        check_new_batch(&map, codes)?;

        for record in codes {
            map.insert(record.code.clone(), record.clone());
        }
        Ok(())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>> {
        Ok(self.codes.read().get(code).cloned())
    }

    fn update_usage(&self, code: &DiscountCode) -> Result<()> {
        let mut map = self.codes.write();
        let record = map
            .get_mut(&code.code)
            .ok_or_else(|| DiscountError::CodeNotFound(code.code.clone()))?;

        record.is_used = code.is_used;
        record.used_at = code.used_at;
        Ok(())
    }
}
