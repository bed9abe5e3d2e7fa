// crates/venture-sim-core/src/runtime/policy.rs
// ============================================================================
// Module: Venture Sim Policy Engine
// Description: Pre-commit action evaluation and post-commit invariant checks.
// Purpose: Gate every proposed action with rule-level attribution and surface
//          state invariant violations as alarms.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Evaluation is safety-first: all hard-constraint violations are collected
//! and a single DENY carries the complete list; only a violation-free action
//! can escalate on impact or risk thresholds; everything else approves.
//! Invariant checks are informational: they alarm, they never rewind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::Action;
use crate::core::ActionKind;
use crate::core::AgentRole;
use crate::core::CompanyState;
use crate::core::Constraints;
use crate::core::PolicySet;

// ============================================================================
// SECTION: Policy Results
// ============================================================================

/// Policy gate decision.
///
/// # Invariants
/// - Variants are stable for serialization; `Deny` always wins over
///   `Escalate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    /// Action complies with all policies.
    Approve,
    /// Action violates at least one hard constraint.
    Deny,
    /// Action exceeds an approval or risk threshold.
    Escalate,
}

/// Outcome of one policy evaluation.
///
/// # Invariants
/// - `violated_rules` is non-empty exactly when `decision` is `Deny`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// Gate decision.
    pub decision: PolicyDecision,
    /// Human-readable rationale.
    pub reason: String,
    /// Every violated hard constraint, for atomic surfacing.
    pub violated_rules: Vec<String>,
}

/// Invariant violated by the current state.
///
/// # Invariants
/// - Variants are stable for serialization and alarm routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// Cash is negative.
    CashNegative {
        /// Observed cash balance.
        cash: f64,
    },
    /// Runway fell below the configured minimum.
    RunwayTooLow {
        /// Observed runway in months.
        runway_months: f64,
        /// Configured minimum.
        minimum: f64,
    },
    /// Service level fell below the SLA target.
    ServiceLevelBelowSla {
        /// Observed service level.
        service_level: f64,
        /// Configured minimum.
        minimum: f64,
    },
}

// ============================================================================
// SECTION: Policy Engine
// ============================================================================

/// Synchronous pre-commit policy gate.
///
/// # Invariants
/// - Evaluation is pure: identical inputs yield identical results.
/// - Unset policy options disable their checks.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    /// Configured policy options.
    policies: PolicySet,
    /// Operational constraints (hiring velocity, SLA targets).
    constraints: Constraints,
}

impl PolicyEngine {
    /// Creates a policy engine from the blueprint's policy and constraint sets.
    #[must_use]
    pub const fn new(policies: PolicySet, constraints: Constraints) -> Self {
        Self {
            policies,
            constraints,
        }
    }

    /// Evaluates one action against the current state.
    ///
    /// Hard-constraint violations are collected first; any violation forces
    /// DENY with the complete list. Otherwise impact and risk thresholds may
    /// force ESCALATE. Otherwise the action approves.
    #[must_use]
    pub fn evaluate_action(
        &self,
        action: &Action,
        state: &CompanyState,
        _agent_role: Option<&AgentRole>,
    ) -> PolicyResult {
        let violated = self.hard_constraint_violations(action, state);
        if !violated.is_empty() {
            return PolicyResult {
                decision: PolicyDecision::Deny,
                reason: format!("policy violations: {}", violated.join(", ")),
                violated_rules: violated,
            };
        }

        let estimated_impact = action.estimated_impact.unwrap_or(0.0);
        let needs_approval = self
            .policies
            .approval_threshold
            .is_some_and(|threshold| estimated_impact > threshold);
        let risk_score = action.risk_score.unwrap_or(0.0);
        let too_risky =
            self.policies.risk_appetite.is_some_and(|appetite| risk_score > appetite);

        if needs_approval || too_risky {
            return PolicyResult {
                decision: PolicyDecision::Escalate,
                reason: format!(
                    "requires approval (impact: {estimated_impact:.0}, risk: {risk_score:.2})"
                ),
                violated_rules: Vec::new(),
            };
        }

        PolicyResult {
            decision: PolicyDecision::Approve,
            reason: "action complies with all policies".to_string(),
            violated_rules: Vec::new(),
        }
    }

    /// Collects every hard-constraint violation for an action.
    fn hard_constraint_violations(&self, action: &Action, state: &CompanyState) -> Vec<String> {
        let mut violated = Vec::new();
        match &action.kind {
            ActionKind::AllocateBudget { allocation } => {
                if let Some(limit) = self.policies.spend_limit_monthly {
                    let total: f64 = allocation.values().sum();
                    if total > limit {
                        violated.push(format!("spend_limit: {total:.0} > {limit:.0}"));
                    }
                }
            }
            ActionKind::ChangePricing { pricing } => {
                if let Some(max_change) = self.policies.max_percent_change.pricing {
                    for (product, new_price) in pricing {
                        let Some(old_price) = state.pricing.get(product).copied() else {
                            continue;
                        };
                        if old_price == 0.0 {
                            continue;
                        }
                        let change = ((new_price - old_price) / old_price).abs();
                        if change > max_change {
                            violated.push(format!(
                                "pricing_change: {:.1}% > {:.1}% for {product}",
                                change * 100.0,
                                max_change * 100.0
                            ));
                        }
                    }
                }
            }
            ActionKind::AdjustHiring { delta, .. } => {
                if let Some(max_velocity) = self.constraints.hiring_velocity_max
                    && delta.abs() > max_velocity
                {
                    violated.push(format!("hiring_velocity: {} > {max_velocity}", delta.abs()));
                }
            }
            ActionKind::ModifyInventoryPolicy { .. } | ActionKind::TriggerCostCutting { .. } => {}
        }
        violated
    }

    /// Returns every invariant the state currently violates.
    ///
    /// Violations are alarms for the caller; history is never rewound.
    #[must_use]
    pub fn check_invariants(&self, state: &CompanyState) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        if state.cash < 0.0 {
            violations.push(InvariantViolation::CashNegative {
                cash: state.cash,
            });
        }
        if let Some(minimum) = self.policies.min_runway_months {
            let runway_months = state.runway_months();
            if runway_months < minimum {
                violations.push(InvariantViolation::RunwayTooLow {
                    runway_months,
                    minimum,
                });
            }
        }
        if let Some(minimum) = self.constraints.sla_targets.min
            && state.service_level < minimum
        {
            violations.push(InvariantViolation::ServiceLevelBelowSla {
                service_level: state.service_level,
                minimum,
            });
        }
        violations
    }
}
