// crates/venture-sim-core/src/core/audit.rs
// ============================================================================
// Module: Venture Sim Audit Records
// Description: Signed audit entries and exportable bundles.
// Purpose: Define the wire forms of the tamper-evident decision record.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit entries form a per-run chain: dense sequence numbers, each entry
//! carrying the previous entry's signature, each signature covering the
//! canonical JSON of the entry minus the signature itself. Bundles package a
//! run's chain with the public key for fully offline verification.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AgentRole;
use crate::core::identifiers::RunId;
use crate::core::time::SimTime;

// ============================================================================
// SECTION: Entry Types
// ============================================================================

/// Kind of decision or lifecycle moment an audit entry records.
///
/// # Invariants
/// - Variants are stable for serialization and offline verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Run was created.
    RunStarted,
    /// Agent proposed an action.
    ActionProposed,
    /// Policy gate approved an action.
    ActionApproved,
    /// Policy gate denied an action.
    ActionDenied,
    /// Policy gate escalated an action to the approval queue.
    ActionEscalated,
    /// Engine committed an action's state transition.
    ActionApplied,
    /// Engine rejected an action's state transition.
    ActionFailed,
    /// A pending action was approved out-of-band.
    ApprovalGranted,
    /// Population agent recorded market dynamics.
    MarketObserved,
    /// Engine advanced one tick.
    TickAdvanced,
}

// ============================================================================
// SECTION: Audit Entries
// ============================================================================

/// One signed entry in a run's audit chain.
///
/// # Invariants
/// - `sequence` values are dense from 0 within a run.
/// - `prev_signature` equals the previous entry's `signature` (absent at 0).
/// - `signature` is hex Ed25519 over the canonical JSON of the entry minus
///   its own `signature` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Run the entry belongs to.
    pub run_id: RunId,
    /// Dense per-run sequence number.
    pub sequence: u64,
    /// Caller-supplied wall-clock stamp (never read from the host clock).
    pub wall_time: SimTime,
    /// Simulation time when the entry was recorded.
    pub sim_time: SimTime,
    /// Kind of moment recorded.
    pub entry_type: EntryType,
    /// Role of the acting agent, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// Free-form entry payload; an `id` key makes the append idempotent.
    pub data: Value,
    /// Signature of the previous entry, absent for sequence 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_signature: Option<String>,
    /// Hex Ed25519 signature over the canonical unsigned form.
    pub signature: String,
}

impl AuditEntry {
    /// Idempotency key from the entry payload, when present.
    #[must_use]
    pub fn data_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }
}

/// Unsigned view of an entry: the exact bytes a signature covers.
///
/// # Invariants
/// - Field names and values mirror [`AuditEntry`] minus `signature`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsignedEntry<'a> {
    /// Run the entry belongs to.
    pub run_id: &'a RunId,
    /// Dense per-run sequence number.
    pub sequence: u64,
    /// Caller-supplied wall-clock stamp.
    pub wall_time: SimTime,
    /// Simulation time when the entry was recorded.
    pub sim_time: SimTime,
    /// Kind of moment recorded.
    pub entry_type: EntryType,
    /// Role of the acting agent, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<&'a AgentRole>,
    /// Free-form entry payload.
    pub data: &'a Value,
    /// Signature of the previous entry, absent for sequence 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_signature: Option<&'a str>,
}

impl<'a> From<&'a AuditEntry> for UnsignedEntry<'a> {
    fn from(entry: &'a AuditEntry) -> Self {
        Self {
            run_id: &entry.run_id,
            sequence: entry.sequence,
            wall_time: entry.wall_time,
            sim_time: entry.sim_time,
            entry_type: entry.entry_type,
            agent_role: entry.agent_role.as_ref(),
            data: &entry.data,
            prev_signature: entry.prev_signature.as_deref(),
        }
    }
}

// ============================================================================
// SECTION: Audit Bundles
// ============================================================================

/// Exported, independently verifiable audit bundle for one run.
///
/// # Invariants
/// - `bundle_signature` is hex Ed25519 over the canonical JSON of the bundle
///   minus its own `bundle_signature` field.
/// - Verification requires only the bundle bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditBundle {
    /// Run the bundle covers.
    pub run_id: RunId,
    /// Complete entry chain in sequence order.
    pub entries: Vec<AuditEntry>,
    /// Number of entries in the chain.
    pub entry_count: u64,
    /// Hex Ed25519 public key verifying every signature in the bundle.
    pub public_key: String,
    /// Caller-supplied export stamp.
    pub exported_at: SimTime,
    /// Hex Ed25519 signature over the canonical unsigned bundle form.
    pub bundle_signature: String,
}

/// Unsigned view of a bundle: the exact bytes the bundle signature covers.
///
/// # Invariants
/// - Field names and values mirror [`AuditBundle`] minus `bundle_signature`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsignedBundle<'a> {
    /// Run the bundle covers.
    pub run_id: &'a RunId,
    /// Complete entry chain in sequence order.
    pub entries: &'a [AuditEntry],
    /// Number of entries in the chain.
    pub entry_count: u64,
    /// Hex Ed25519 public key.
    pub public_key: &'a str,
    /// Caller-supplied export stamp.
    pub exported_at: SimTime,
}

impl<'a> From<&'a AuditBundle> for UnsignedBundle<'a> {
    fn from(bundle: &'a AuditBundle) -> Self {
        Self {
            run_id: &bundle.run_id,
            entries: &bundle.entries,
            entry_count: bundle.entry_count,
            public_key: &bundle.public_key,
            exported_at: bundle.exported_at,
        }
    }
}
