// crates/venture-sim-core/src/runtime/ledger.rs
// ============================================================================
// Module: Venture Sim Audit Ledger
// Description: Per-run, sequenced, signature-chained append-only log.
// Purpose: Record every decision tamper-evidently with idempotent append and
//          independently verifiable export bundles.
// Dependencies: crate::core, ed25519-dalek, serde_jcs (via hashing), thiserror
// ============================================================================

//! ## Overview
//! One ledger serves a set of runs; each run owns an independent chain whose
//! sequence is serialized by a per-run lock. Appends are idempotent on the
//! payload's `id` key. Every signature covers the canonical JSON of the entry
//! minus the signature itself, and each entry carries its predecessor's
//! signature, so any mutation breaks the chain. The ledger never loses or
//! rewrites an entry; on append failure the caller retries with the same id
//! and receives the already-recorded entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::Verifier;
use ed25519_dalek::VerifyingKey;
use serde_json::Value;
use thiserror::Error;

use crate::core::AgentRole;
use crate::core::AuditBundle;
use crate::core::AuditEntry;
use crate::core::EntryType;
use crate::core::RunId;
use crate::core::SimTime;
use crate::core::audit::UnsignedBundle;
use crate::core::audit::UnsignedEntry;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::decode_hex;
use crate::core::hashing::encode_hex;
use crate::interfaces::LedgerStore;
use crate::interfaces::LedgerStoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Audit ledger errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; chain failures are fatal
///   for the affected run only.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Canonicalization of an entry or bundle failed.
    #[error(transparent)]
    Hashing(#[from] HashError),
    /// A run lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned for run {run_id}")]
    LockPoisoned {
        /// Run whose lock failed.
        run_id: RunId,
    },
    /// Chain verification failed.
    #[error("chain verification failed for run {run_id} at sequence {sequence}: {detail}")]
    ChainBroken {
        /// Run whose chain failed.
        run_id: RunId,
        /// First failing sequence number.
        sequence: u64,
        /// Failure detail.
        detail: String,
    },
    /// Bundle verification failed.
    #[error("bundle verification failed: {detail}")]
    BundleInvalid {
        /// Failure detail.
        detail: String,
    },
    /// Durable store rejected a write or read.
    #[error(transparent)]
    Store(#[from] LedgerStoreError),
}

// ============================================================================
// SECTION: Append Requests
// ============================================================================

/// One append request; times are caller-supplied, never read from the clock.
///
/// # Invariants
/// - A `data.id` string key makes the append idempotent per run.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// Run the entry belongs to.
    pub run_id: RunId,
    /// Caller-supplied wall-clock stamp.
    pub wall_time: SimTime,
    /// Simulation time of the recorded moment.
    pub sim_time: SimTime,
    /// Kind of moment recorded.
    pub entry_type: EntryType,
    /// Role of the acting agent, when applicable.
    pub agent_role: Option<AgentRole>,
    /// Free-form entry payload.
    pub data: Value,
}

// ============================================================================
// SECTION: Per-Run Chains
// ============================================================================

/// One run's chain state, guarded by its own lock.
#[derive(Debug, Default)]
struct RunChain {
    /// Entries in sequence order.
    entries: Vec<AuditEntry>,
    /// Signature of the last entry, hex.
    last_signature: Option<String>,
}

// ============================================================================
// SECTION: Audit Ledger
// ============================================================================

/// Append-only, signature-chained audit ledger.
///
/// # Invariants
/// - Sequence numbers are assigned under the per-run lock: dense from 0,
///   never reused, never out of order.
/// - The signing key is injected at construction (derived from run inputs by
///   the engine) and never serialized by the ledger.
pub struct AuditLedger {
    /// Ed25519 signing key.
    signing_key: SigningKey,
    /// Per-run chains; the outer lock only guards map shape.
    chains: RwLock<BTreeMap<RunId, Arc<Mutex<RunChain>>>>,
    /// Optional durable backing store.
    store: Option<Arc<dyn LedgerStore>>,
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger").finish_non_exhaustive()
    }
}

impl AuditLedger {
    /// Creates a ledger around an existing signing key.
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            chains: RwLock::new(BTreeMap::new()),
            store: None,
        }
    }

    /// Attaches a durable backing store mirroring every append.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn LedgerStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Hex-encoded public verifying key for external verification.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        encode_hex(self.signing_key.verifying_key().as_bytes())
    }

    /// Returns the chain handle for a run, creating it on first use.
    fn chain_handle(&self, run_id: &RunId) -> Result<Arc<Mutex<RunChain>>, LedgerError> {
        {
            let chains = self.chains.read().map_err(|_| LedgerError::LockPoisoned {
                run_id: run_id.clone(),
            })?;
            if let Some(chain) = chains.get(run_id) {
                return Ok(Arc::clone(chain));
            }
        }
        let mut chains = self.chains.write().map_err(|_| LedgerError::LockPoisoned {
            run_id: run_id.clone(),
        })?;
        Ok(Arc::clone(chains.entry(run_id.clone()).or_default()))
    }

    /// Appends an entry, idempotently when the payload carries an `id` key.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] on canonicalization or store failure; the
    /// in-memory chain is unchanged on failure and the caller may retry with
    /// the same id.
    pub fn append(&self, request: AppendRequest) -> Result<AuditEntry, LedgerError> {
        let handle = self.chain_handle(&request.run_id)?;
        let mut chain = handle.lock().map_err(|_| LedgerError::LockPoisoned {
            run_id: request.run_id.clone(),
        })?;

        if let Some(id) = request.data.get("id").and_then(Value::as_str)
            && let Some(existing) = chain.entries.iter().find(|entry| entry.data_id() == Some(id))
        {
            return Ok(existing.clone());
        }

        let sequence = chain.entries.len() as u64;
        let prev_signature = chain.last_signature.clone();
        let unsigned = UnsignedEntry {
            run_id: &request.run_id,
            sequence,
            wall_time: request.wall_time,
            sim_time: request.sim_time,
            entry_type: request.entry_type,
            agent_role: request.agent_role.as_ref(),
            data: &request.data,
            prev_signature: prev_signature.as_deref(),
        };
        let canonical = canonical_json_bytes(&unsigned)?;
        let signature = encode_hex(&self.signing_key.sign(&canonical).to_bytes());

        let entry = AuditEntry {
            run_id: request.run_id.clone(),
            sequence,
            wall_time: request.wall_time,
            sim_time: request.sim_time,
            entry_type: request.entry_type,
            agent_role: request.agent_role,
            data: request.data,
            prev_signature,
            signature: signature.clone(),
        };

        if let Some(store) = &self.store {
            store.insert_if_absent(&entry.run_id, sequence, &entry)?;
        }

        chain.last_signature = Some(signature);
        chain.entries.push(entry.clone());
        Ok(entry)
    }

    /// Returns a copy of a run's entries in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LockPoisoned`] when the run lock failed.
    pub fn entries(&self, run_id: &RunId) -> Result<Vec<AuditEntry>, LedgerError> {
        let handle = self.chain_handle(run_id)?;
        let chain = handle.lock().map_err(|_| LedgerError::LockPoisoned {
            run_id: run_id.clone(),
        })?;
        Ok(chain.entries.clone())
    }

    /// Verifies a run's full chain: dense sequences, predecessor linkage, and
    /// every signature. Any failure short-circuits to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LockPoisoned`] when the run lock failed; chain
    /// failures are the `Ok(false)` outcome, not an error.
    pub fn verify_chain(&self, run_id: &RunId) -> Result<bool, LedgerError> {
        let entries = self.entries(run_id)?;
        Ok(verify_entries(&entries, &self.signing_key.verifying_key()).is_ok())
    }

    /// Exports a run's chain as a signed, self-contained bundle.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] on canonicalization failure.
    pub fn export_bundle(
        &self,
        run_id: &RunId,
        exported_at: SimTime,
    ) -> Result<AuditBundle, LedgerError> {
        let entries = self.entries(run_id)?;
        let public_key = self.public_key_hex();
        let entry_count = entries.len() as u64;
        let unsigned = UnsignedBundle {
            run_id,
            entries: &entries,
            entry_count,
            public_key: &public_key,
            exported_at,
        };
        let canonical = canonical_json_bytes(&unsigned)?;
        let bundle_signature = encode_hex(&self.signing_key.sign(&canonical).to_bytes());
        Ok(AuditBundle {
            run_id: run_id.clone(),
            entries,
            entry_count,
            public_key,
            exported_at,
            bundle_signature,
        })
    }
}

// ============================================================================
// SECTION: Offline Verification
// ============================================================================

/// Verifies an exported bundle given only the bundle itself.
///
/// # Errors
///
/// Returns [`LedgerError::BundleInvalid`] or [`LedgerError::ChainBroken`]
/// naming the first failure.
pub fn verify_bundle(bundle: &AuditBundle) -> Result<(), LedgerError> {
    let key_bytes = decode_hex(&bundle.public_key).map_err(|err| LedgerError::BundleInvalid {
        detail: format!("public key: {err}"),
    })?;
    let key_array: [u8; 32] =
        key_bytes.as_slice().try_into().map_err(|_| LedgerError::BundleInvalid {
            detail: "public key must be 32 bytes".to_string(),
        })?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_array).map_err(|err| LedgerError::BundleInvalid {
            detail: format!("public key: {err}"),
        })?;

    if bundle.entry_count != bundle.entries.len() as u64 {
        return Err(LedgerError::BundleInvalid {
            detail: "entry_count does not match entries".to_string(),
        });
    }
    verify_entries(&bundle.entries, &verifying_key)?;

    let unsigned = UnsignedBundle::from(bundle);
    let canonical = canonical_json_bytes(&unsigned)?;
    let signature = parse_signature(&bundle.bundle_signature).map_err(|detail| {
        LedgerError::BundleInvalid {
            detail,
        }
    })?;
    verifying_key.verify(&canonical, &signature).map_err(|_| LedgerError::BundleInvalid {
        detail: "bundle signature rejected".to_string(),
    })
}

/// Verifies an entry chain against a verifying key.
fn verify_entries(entries: &[AuditEntry], key: &VerifyingKey) -> Result<(), LedgerError> {
    let mut prev_signature: Option<&str> = None;
    for (index, entry) in entries.iter().enumerate() {
        let sequence = index as u64;
        let fail = |detail: String| LedgerError::ChainBroken {
            run_id: entry.run_id.clone(),
            sequence,
            detail,
        };
        if entry.sequence != sequence {
            return Err(fail(format!("sequence gap: found {}", entry.sequence)));
        }
        if entry.prev_signature.as_deref() != prev_signature {
            return Err(fail("predecessor signature mismatch".to_string()));
        }
        let unsigned = UnsignedEntry::from(entry);
        let canonical = canonical_json_bytes(&unsigned)?;
        let signature = parse_signature(&entry.signature).map_err(fail)?;
        key.verify(&canonical, &signature)
            .map_err(|_| LedgerError::ChainBroken {
                run_id: entry.run_id.clone(),
                sequence,
                detail: "signature rejected".to_string(),
            })?;
        prev_signature = Some(entry.signature.as_str());
    }
    Ok(())
}

/// Parses a hex Ed25519 signature.
fn parse_signature(text: &str) -> Result<Signature, String> {
    let bytes = decode_hex(text).map_err(|err| format!("signature: {err}"))?;
    let array: [u8; 64] =
        bytes.as_slice().try_into().map_err(|_| "signature must be 64 bytes".to_string())?;
    Ok(Signature::from_bytes(&array))
}
