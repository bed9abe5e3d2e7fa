// crates/venture-sim-core/src/core/action.rs
// ============================================================================
// Module: Venture Sim Actions
// Description: Agent action proposals as a discriminated union over action types.
// Purpose: Give every proposal a closed, validated payload and an idempotency key.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Actions enter the core as already-structured proposals. The payload is a
//! closed union over the five supported action types; idempotency is keyed by
//! the action id, which the engine mints at registration when absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActionId;
use crate::core::identifiers::AgentRole;
use crate::core::identifiers::ProductId;

// ============================================================================
// SECTION: Action Payloads
// ============================================================================

/// Default per-head monthly cost for hiring adjustments.
const DEFAULT_COST_PER_HEAD: f64 = 10_000.0;

/// Default cost reduction fraction for cost-cutting actions.
const DEFAULT_REDUCTION_PERCENT: f64 = 0.1;

/// Returns the default per-head monthly cost.
const fn default_cost_per_head() -> f64 {
    DEFAULT_COST_PER_HEAD
}

/// Returns the default cost reduction fraction.
const fn default_reduction_percent() -> f64 {
    DEFAULT_REDUCTION_PERCENT
}

/// Action payload as a discriminated union over the supported types.
///
/// # Invariants
/// - The wire form is `{"type": ..., "params": {...}}` with stable type tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ActionKind {
    /// Adjust headcount by a signed delta.
    AdjustHiring {
        /// Signed headcount change.
        delta: i64,
        /// Monthly cost added (or removed) per head.
        #[serde(default = "default_cost_per_head")]
        cost_per_head: f64,
    },
    /// Overlay new list prices onto the current pricing map.
    ChangePricing {
        /// New prices per product; unlisted products keep their price.
        pricing: BTreeMap<ProductId, f64>,
    },
    /// Spend cash across named budget lines.
    AllocateBudget {
        /// Allocation per budget line.
        allocation: BTreeMap<String, f64>,
    },
    /// Overlay new inventory targets onto the current inventory map.
    ModifyInventoryPolicy {
        /// New inventory levels per product; unlisted products keep theirs.
        inventory: BTreeMap<ProductId, f64>,
    },
    /// Cut monthly costs by a fraction.
    TriggerCostCutting {
        /// Fraction of monthly costs removed, in `[0, 1]`.
        #[serde(default = "default_reduction_percent")]
        reduction_percent: f64,
    },
}

impl ActionKind {
    /// Stable type tag of the payload, matching the wire form.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::AdjustHiring { .. } => "adjust_hiring",
            Self::ChangePricing { .. } => "change_pricing",
            Self::AllocateBudget { .. } => "allocate_budget",
            Self::ModifyInventoryPolicy { .. } => "modify_inventory_policy",
            Self::TriggerCostCutting { .. } => "trigger_cost_cutting",
        }
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Agent action proposal routed through the policy gate.
///
/// # Invariants
/// - `id` keys at-most-once application; the engine mints one at registration
///   when the proposer omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Idempotency key; minted at registration when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActionId>,
    /// Typed payload.
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Role of the proposing agent, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// Estimated financial impact, compared against the approval threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_impact: Option<f64>,
    /// Risk score in `[0, 1]`, compared against the risk appetite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Free-form rationale attached by the proposer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Action {
    /// Creates an action from a payload with all optional fields unset.
    #[must_use]
    pub const fn new(kind: ActionKind) -> Self {
        Self {
            id: None,
            kind,
            agent_role: None,
            estimated_impact: None,
            risk_score: None,
            reason: None,
        }
    }

    /// Returns the action with the given idempotency key.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ActionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the action attributed to the given agent role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<AgentRole>) -> Self {
        self.agent_role = Some(role.into());
        self
    }

    /// Reason text, or the empty string when the proposer attached none.
    #[must_use]
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}
