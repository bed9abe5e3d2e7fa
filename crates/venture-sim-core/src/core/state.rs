// crates/venture-sim-core/src/core/state.rs
// ============================================================================
// Module: Venture Sim Company State
// Description: Immutable company snapshots and validated state transitions.
// Purpose: Capture deterministic state evolution for replay and verification.
// Dependencies: crate::core::{action, hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A [`CompanyState`] is produced once and never mutated. Evolution happens
//! through [`CompanyState::clone_with`], which applies overrides and bumps the
//! version, and every commit is described by a [`StateTransition`] whose
//! validity rules gate what the engine will accept.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::action::Action;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AgentRole;
use crate::core::identifiers::ProductId;
use crate::core::time::SimTime;

// ============================================================================
// SECTION: Company State
// ============================================================================

/// Metadata key carrying the monthly growth rate.
pub const GROWTH_RATE_KEY: &str = "growth_rate";

/// Immutable snapshot of a company at a point in simulation time.
///
/// # Invariants
/// - `version` is monotone across the snapshots of one run.
/// - Snapshots are never mutated after construction; evolution goes through
///   [`CompanyState::clone_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyState {
    /// Wall-clock timestamp of the snapshot.
    pub timestamp: SimTime,
    /// Monotone snapshot version.
    pub version: u64,
    /// Cash on hand.
    pub cash: f64,
    /// Monthly recognized revenue.
    pub revenue_monthly: f64,
    /// Monthly operating costs.
    pub costs_monthly: f64,
    /// Gross margin fraction.
    pub margin: f64,
    /// Current headcount.
    pub headcount: u64,
    /// Production capacity per product.
    pub capacity: BTreeMap<ProductId, f64>,
    /// Capacity utilization per product.
    pub utilization: BTreeMap<ProductId, f64>,
    /// Market demand per product.
    pub demand: BTreeMap<ProductId, f64>,
    /// List price per product.
    pub pricing: BTreeMap<ProductId, f64>,
    /// Customer acquisition cost per product.
    pub cac: BTreeMap<ProductId, f64>,
    /// Monthly churn fraction in `[0, 1]`.
    pub churn_rate: f64,
    /// Inventory units per product.
    pub inventory: BTreeMap<ProductId, f64>,
    /// Unfulfilled demand per product.
    pub backlog: BTreeMap<ProductId, f64>,
    /// Replenishment lead time in days per product.
    pub lead_times: BTreeMap<ProductId, u32>,
    /// Fulfilled-demand fraction in `[0, 1]`.
    pub service_level: f64,
    /// Open risk flags.
    pub risk_flags: BTreeMap<String, Value>,
    /// Compliance score in `[0, 1]`.
    pub compliance_score: f64,
    /// Open extension mapping; carries `growth_rate` among others.
    pub metadata: BTreeMap<String, Value>,
}

impl CompanyState {
    /// Returns a new snapshot with the overrides applied and `version + 1`.
    ///
    /// Mapping-typed overrides replace the whole mapping; unset fields are
    /// copied structurally from this snapshot.
    #[must_use]
    pub fn clone_with(&self, overrides: StateOverrides) -> Self {
        Self {
            timestamp: overrides.timestamp.unwrap_or(self.timestamp),
            version: self.version + 1,
            cash: overrides.cash.unwrap_or(self.cash),
            revenue_monthly: overrides.revenue_monthly.unwrap_or(self.revenue_monthly),
            costs_monthly: overrides.costs_monthly.unwrap_or(self.costs_monthly),
            margin: overrides.margin.unwrap_or(self.margin),
            headcount: overrides.headcount.unwrap_or(self.headcount),
            capacity: overrides.capacity.unwrap_or_else(|| self.capacity.clone()),
            utilization: overrides.utilization.unwrap_or_else(|| self.utilization.clone()),
            demand: overrides.demand.unwrap_or_else(|| self.demand.clone()),
            pricing: overrides.pricing.unwrap_or_else(|| self.pricing.clone()),
            cac: overrides.cac.unwrap_or_else(|| self.cac.clone()),
            churn_rate: overrides.churn_rate.unwrap_or(self.churn_rate),
            inventory: overrides.inventory.unwrap_or_else(|| self.inventory.clone()),
            backlog: overrides.backlog.unwrap_or_else(|| self.backlog.clone()),
            lead_times: overrides.lead_times.unwrap_or_else(|| self.lead_times.clone()),
            service_level: overrides.service_level.unwrap_or(self.service_level),
            risk_flags: overrides.risk_flags.unwrap_or_else(|| self.risk_flags.clone()),
            compliance_score: overrides.compliance_score.unwrap_or(self.compliance_score),
            metadata: overrides.metadata.unwrap_or_else(|| self.metadata.clone()),
        }
    }

    /// Returns the deterministic digest of the canonical snapshot form.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the snapshot contains non-finite floats.
    pub fn hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Months of runway at current burn; infinite when costs are non-positive.
    #[must_use]
    pub fn runway_months(&self) -> f64 {
        if self.costs_monthly <= 0.0 {
            f64::INFINITY
        } else {
            self.cash / self.costs_monthly
        }
    }

    /// Monthly growth rate carried in metadata; zero when absent.
    #[must_use]
    pub fn growth_rate(&self) -> f64 {
        self.metadata.get(GROWTH_RATE_KEY).and_then(Value::as_f64).unwrap_or(0.0)
    }
}

// ============================================================================
// SECTION: State Overrides
// ============================================================================

/// Field overrides consumed by [`CompanyState::clone_with`].
///
/// # Invariants
/// - `None` means "keep the current value"; `Some` replaces the field
///   wholesale, including mapping-typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateOverrides {
    /// New snapshot timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<SimTime>,
    /// New cash balance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<f64>,
    /// New monthly revenue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_monthly: Option<f64>,
    /// New monthly costs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs_monthly: Option<f64>,
    /// New gross margin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    /// New headcount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headcount: Option<u64>,
    /// Replacement capacity mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<BTreeMap<ProductId, f64>>,
    /// Replacement utilization mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<BTreeMap<ProductId, f64>>,
    /// Replacement demand mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand: Option<BTreeMap<ProductId, f64>>,
    /// Replacement pricing mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<BTreeMap<ProductId, f64>>,
    /// Replacement customer-acquisition-cost mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cac: Option<BTreeMap<ProductId, f64>>,
    /// New churn rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_rate: Option<f64>,
    /// Replacement inventory mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<BTreeMap<ProductId, f64>>,
    /// Replacement backlog mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog: Option<BTreeMap<ProductId, f64>>,
    /// Replacement lead-time mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_times: Option<BTreeMap<ProductId, u32>>,
    /// New service level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_level: Option<f64>,
    /// Replacement risk-flag mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_flags: Option<BTreeMap<String, Value>>,
    /// New compliance score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<f64>,
    /// Replacement metadata mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

// ============================================================================
// SECTION: State Transitions
// ============================================================================

/// Transition rule violated by a candidate commit.
///
/// # Invariants
/// - Variants are stable for serialization and result reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionViolation {
    /// Resulting cash would be negative.
    NegativeCash,
    /// Version did not advance by exactly one.
    VersionNotIncremented,
    /// Timestamp moved backwards.
    TimestampRegressed,
}

/// One committed (or candidate) state change with its provenance.
///
/// # Invariants
/// - `after.version == before.version + 1` for every committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Snapshot before the change.
    pub before: CompanyState,
    /// Snapshot after the change.
    pub after: CompanyState,
    /// Action that produced the change.
    pub action: Action,
    /// Role of the proposing agent, when known.
    pub agent_role: Option<AgentRole>,
    /// Free-form reason attached by the proposer.
    pub reason: String,
    /// Wall-clock stamp of the commit.
    pub committed_at: SimTime,
}

impl StateTransition {
    /// Returns every transition rule this candidate violates.
    ///
    /// Headcount non-negativity is enforced structurally (`headcount` is
    /// unsigned), so only the remaining rules are checked here.
    #[must_use]
    pub fn violations(&self) -> Vec<TransitionViolation> {
        let mut violations = Vec::new();
        if self.after.cash < 0.0 {
            violations.push(TransitionViolation::NegativeCash);
        }
        if self.after.version != self.before.version + 1 {
            violations.push(TransitionViolation::VersionNotIncremented);
        }
        if self.after.timestamp < self.before.timestamp {
            violations.push(TransitionViolation::TimestampRegressed);
        }
        violations
    }

    /// Returns `true` when the candidate violates no transition rule.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}
