//! Registry Module
//!
//! The authority over code uniqueness and usage state.
//!
//! ## Responsibilities
//! - Seed the uniqueness set from the store on startup
//! - Generate batches of codes that were never issued before
//! - Redeem a code at most once, however many clients race for it

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use crate::code::{self, CodeGenerator, DiscountCode, RedeemOutcome, MAX_BATCH_SIZE};
use crate::config::Config;
use crate::error::{DiscountError, Result};
use crate::store::{self, CodeStore};

/// Number of striped locks guarding redemption
const REDEEM_LOCK_STRIPES: usize = 64;

/// Generation attempts allowed per requested code
const ATTEMPTS_PER_CODE: usize = 10;

/// Codes produced by one generate call
#[derive(Debug, Clone)]
pub struct GeneratedBatch {
    /// Committed codes, in generation order
    pub codes: Vec<DiscountCode>,

    /// How many codes the caller asked for
    pub requested: usize,
}

impl GeneratedBatch {
    /// Whether the full requested count was produced
    ///
    /// A short batch means the attempt cap was hit and must be reported
    /// to the client as a failure.
    pub fn is_complete(&self) -> bool {
        self.codes.len() == self.requested
    }
}

/// State guarded by the generation lock
struct Issued {
    /// Every code ever issued
    codes: HashSet<String>,

    /// Random source for candidates
    generator: CodeGenerator,
}

/// Shared code registry
///
/// ## Concurrency Model
///
/// - **Generation**: serialized by the `issued` lock, held across the
///   check-and-insert of the whole batch and the store append. Two
///   concurrent batches can never accept the same candidate.
/// - **Redemption**: serialized per code by a striped lock held across
///   lookup, flag flip and store update. Exactly one of any number of
///   concurrent attempts on one code succeeds.
///
/// The two paths take disjoint locks, so generation and redemption run
/// concurrently.
pub struct Registry {
    store: Arc<dyn CodeStore>,
    issued: Mutex<Issued>,
    redeem_locks: Box<[Mutex<()>]>,
}

impl Registry {
    /// Build a registry over `store`, seeding the uniqueness set
    pub fn new(store: Arc<dyn CodeStore>, generator: CodeGenerator) -> Result<Self> {
        let codes: HashSet<String> = store.load_all_codes()?.into_iter().collect();
        tracing::info!("Loaded {} discount codes into the registry", codes.len());

        let redeem_locks = (0..REDEEM_LOCK_STRIPES)
            .map(|_| Mutex::new(()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            store,
            issued: Mutex::new(Issued { codes, generator }),
            redeem_locks,
        })
    }

    /// Open the configured store and build a registry over it
    pub fn open(config: &Config) -> Result<Self> {
        let store = store::open_store(config)?;
        Self::new(store, CodeGenerator::new())
    }

    /// Generate `count` new codes of `length` symbols
    ///
    /// Requires `1 <= count <= 2000` and `length` of 7 or 8; otherwise
    /// nothing is generated or stored. Codes are only added to the
    /// uniqueness set once the store has committed them.
    pub fn generate_batch(&self, count: u16, length: u8) -> Result<GeneratedBatch> {
        if count == 0 || count > MAX_BATCH_SIZE {
            tracing::warn!("Invalid count: {}. Must be between 1-{}", count, MAX_BATCH_SIZE);
            return Err(DiscountError::InvalidRequest(format!(
                "count {} out of range 1-{}",
                count, MAX_BATCH_SIZE
            )));
        }
        if !code::is_valid_length(usize::from(length)) {
            tracing::warn!("Invalid length: {}. Must be 7 or 8", length);
            return Err(DiscountError::InvalidRequest(format!(
                "length {} is not 7 or 8",
                length
            )));
        }

        let requested = usize::from(count);
        let length = usize::from(length);
        let max_attempts = requested * ATTEMPTS_PER_CODE;

        let mut issued = self.issued.lock();
        let mut accepted = HashSet::with_capacity(requested);
        let mut codes = Vec::with_capacity(requested);
        let mut attempts = 0;

        while codes.len() < requested && attempts < max_attempts {
            attempts += 1;
            let candidate = issued.generator.generate(length);
            if issued.codes.contains(&candidate) || !accepted.insert(candidate.clone()) {
                continue;
            }
            codes.push(DiscountCode::new(candidate));
        }

        if !codes.is_empty() {
            if let Err(e) = self.store.append_codes(&codes) {
                tracing::error!("Failed to store {} generated codes: {}", codes.len(), e);
                return Err(e);
            }
            issued.codes.extend(accepted);
        }

        if codes.len() < requested {
            tracing::warn!(
                "Generated only {} of {} codes after {} attempts",
                codes.len(),
                requested,
                attempts
            );
        } else {
            tracing::info!("Generated {} discount codes of length {}", codes.len(), length);
        }

        Ok(GeneratedBatch { codes, requested })
    }

    /// Mark `code` as used, at most once
    pub fn redeem(&self, code: &str) -> RedeemOutcome {
        if !code::is_valid_length(code.chars().count()) {
            tracing::warn!("Invalid code length: {:?}", code);
            return RedeemOutcome::InvalidCode;
        }

        let _guard = self.redeem_lock(code).lock();

        let record = match self.store.find_by_code(code) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!("Invalid code: {}", code);
                return RedeemOutcome::InvalidCode;
            }
            Err(e) => {
                tracing::error!("Failed to look up code {}: {}", code, e);
                return RedeemOutcome::ServerError;
            }
        };

        if record.is_used {
            tracing::warn!("Code already used: {}", code);
            return RedeemOutcome::AlreadyUsed;
        }

        match self.store.update_usage(&record.redeemed(Utc::now())) {
            Ok(()) => {
                tracing::info!("Discount code {} was successfully used", code);
                RedeemOutcome::Success
            }
            Err(e) => {
                tracing::error!("Failed to record use of code {}: {}", code, e);
                RedeemOutcome::ServerError
            }
        }
    }

    /// Number of codes in the uniqueness set
    pub fn issued_count(&self) -> usize {
        self.issued.lock().codes.len()
    }

    /// Whether `code` has ever been issued
    pub fn is_issued(&self, code: &str) -> bool {
        self.issued.lock().codes.contains(code)
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn CodeStore> {
        &self.store
    }

    fn redeem_lock(&self, code: &str) -> &Mutex<()> {
        let stripe = crc32fast::hash(code.as_bytes()) as usize % self.redeem_locks.len();
        &self.redeem_locks[stripe]
    }
}
