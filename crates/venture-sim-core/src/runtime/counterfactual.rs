// crates/venture-sim-core/src/runtime/counterfactual.rs
// ============================================================================
// Module: Venture Sim Counterfactual Evaluation
// Description: Alternative-action generation, forward rollouts, and regret.
// Purpose: Score a chosen action against feasible alternatives by simulating
//          each forward on an engine fork.
// Dependencies: crate::core, crate::runtime::engine, serde
// ============================================================================

//! ## Overview
//! Counterfactual evaluation answers "what would a different action have
//! cost?". Each candidate runs on a fork of the engine. Forks inherit the
//! parent's RNG state, so two evaluations of the same decision point are
//! deterministic and comparable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Action;
use crate::core::ActionKind;
use crate::core::CompanyState;
use crate::core::Constraints;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::Metrics;
use crate::runtime::engine::SimulationEngine;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Metric the regret computation optimizes.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegretMetric {
    /// Final cash balance.
    #[default]
    Cash,
    /// Final monthly revenue.
    RevenueMonthly,
    /// Final runway in months.
    RunwayMonths,
}

impl RegretMetric {
    /// Extracts the metric value from a rollout's final metrics.
    #[must_use]
    pub const fn extract(self, metrics: &Metrics) -> f64 {
        match self {
            Self::Cash => metrics.cash,
            Self::RevenueMonthly => metrics.revenue_monthly,
            Self::RunwayMonths => metrics.runway_months,
        }
    }
}

/// One alternative's simulated outcome.
///
/// # Invariants
/// - `value` equals the chosen metric extracted from `outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeOutcome {
    /// The alternative action.
    pub action: Action,
    /// Final metrics after the rollout.
    pub outcome: Metrics,
    /// Metric value used for ranking.
    pub value: f64,
}

/// Full regret analysis at one decision point.
///
/// # Invariants
/// - `regret == best_value - chosen_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegretAnalysis {
    /// The action actually chosen.
    pub chosen_action: Action,
    /// Final metrics of the chosen rollout.
    pub chosen_outcome: Metrics,
    /// Metric value of the chosen rollout.
    pub chosen_value: f64,
    /// Best-scoring alternative.
    pub best_alternative: AlternativeOutcome,
    /// Metric value of the best alternative.
    pub best_value: f64,
    /// Best alternative minus chosen.
    pub regret: f64,
    /// Regret as a percentage of the chosen value (zero when undefined).
    pub regret_percent: f64,
    /// Every evaluated alternative.
    pub all_alternatives: Vec<AlternativeOutcome>,
}

// ============================================================================
// SECTION: Counterfactual Engine
// ============================================================================

/// Counterfactual evaluator over a borrowed engine snapshot.
///
/// # Invariants
/// - Rollouts run on forks; the borrowed engine is never mutated.
#[derive(Debug)]
pub struct CounterfactualEngine<'a> {
    /// Engine snapshot rollouts fork from.
    engine: &'a SimulationEngine,
}

impl<'a> CounterfactualEngine<'a> {
    /// Creates an evaluator over an engine snapshot.
    #[must_use]
    pub const fn new(engine: &'a SimulationEngine) -> Self {
        Self {
            engine,
        }
    }

    /// Generates feasible alternatives for an action: hold, opposite
    /// direction where feasible, and a moderated variant.
    #[must_use]
    pub fn generate_alternatives(
        &self,
        current_action: &Action,
        state: &CompanyState,
        constraints: &Constraints,
    ) -> Vec<Action> {
        let mut alternatives = Vec::new();
        match &current_action.kind {
            ActionKind::AdjustHiring { delta, cost_per_head } => {
                let max_velocity = constraints.hiring_velocity_max.unwrap_or(i64::MAX);
                alternatives.push(reasoned(
                    ActionKind::AdjustHiring {
                        delta: 0,
                        cost_per_head: *cost_per_head,
                    },
                    "maintain current headcount",
                ));
                if *delta > 0 {
                    alternatives.push(reasoned(
                        ActionKind::AdjustHiring {
                            delta: -(*delta).min(max_velocity),
                            cost_per_head: *cost_per_head,
                        },
                        "reduce headcount instead",
                    ));
                } else if *delta < 0 {
                    alternatives.push(reasoned(
                        ActionKind::AdjustHiring {
                            delta: delta.abs().min(max_velocity),
                            cost_per_head: *cost_per_head,
                        },
                        "increase headcount instead",
                    ));
                }
                if delta.abs() > 2 {
                    alternatives.push(reasoned(
                        ActionKind::AdjustHiring {
                            delta: delta / 2,
                            cost_per_head: *cost_per_head,
                        },
                        "more conservative hiring change",
                    ));
                }
            }
            ActionKind::ChangePricing { pricing } => {
                alternatives.push(reasoned(
                    ActionKind::ChangePricing {
                        pricing: state.pricing.clone(),
                    },
                    "maintain current pricing",
                ));
                let moderated = pricing
                    .iter()
                    .map(|(product, new_price)| {
                        let old_price =
                            state.pricing.get(product).copied().unwrap_or(*new_price);
                        (product.clone(), (new_price - old_price).mul_add(0.5, old_price))
                    })
                    .collect();
                alternatives.push(reasoned(
                    ActionKind::ChangePricing {
                        pricing: moderated,
                    },
                    "more conservative pricing adjustment",
                ));
            }
            ActionKind::AllocateBudget { allocation } => {
                alternatives.push(reasoned(
                    ActionKind::AllocateBudget {
                        allocation: BTreeMap::new(),
                    },
                    "maintain current budget allocation",
                ));
                let reduced = allocation
                    .iter()
                    .map(|(line, amount)| (line.clone(), amount * 0.7))
                    .collect();
                alternatives.push(reasoned(
                    ActionKind::AllocateBudget {
                        allocation: reduced,
                    },
                    "more conservative spending",
                ));
            }
            ActionKind::TriggerCostCutting { reduction_percent } => {
                alternatives.push(reasoned(
                    ActionKind::TriggerCostCutting {
                        reduction_percent: 0.0,
                    },
                    "avoid cost cutting",
                ));
                if *reduction_percent > 0.05 {
                    alternatives.push(reasoned(
                        ActionKind::TriggerCostCutting {
                            reduction_percent: reduction_percent * 0.5,
                        },
                        "less aggressive cost reduction",
                    ));
                }
            }
            ActionKind::ModifyInventoryPolicy { .. } => {
                alternatives.push(reasoned(
                    ActionKind::ModifyInventoryPolicy {
                        inventory: state.inventory.clone(),
                    },
                    "maintain current inventory policy",
                ));
            }
        }
        alternatives
    }

    /// Simulates one action forward on a fork and returns final metrics.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when a forked tick fails.
    pub fn simulate_forward(
        &self,
        action: &Action,
        ticks: u32,
    ) -> Result<Metrics, EngineError> {
        let mut fork = self.engine.fork();
        let _outcome = fork.apply_action(action, action.agent_role.as_ref());
        for _ in 0..ticks {
            if !fork.tick()? {
                break;
            }
        }
        Ok(fork.metrics())
    }

    /// Computes regret: best alternative outcome minus the chosen outcome.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when a rollout fails. Returns `Ok(None)` when
    /// there are no alternatives to compare against.
    pub fn compute_regret(
        &self,
        chosen_action: &Action,
        alternatives: &[Action],
        metric: RegretMetric,
        ticks: u32,
    ) -> Result<Option<RegretAnalysis>, EngineError> {
        let chosen_outcome = self.simulate_forward(chosen_action, ticks)?;
        let chosen_value = metric.extract(&chosen_outcome);

        let mut outcomes = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let outcome = self.simulate_forward(alternative, ticks)?;
            let value = metric.extract(&outcome);
            outcomes.push(AlternativeOutcome {
                action: alternative.clone(),
                outcome,
                value,
            });
        }

        let Some(best_alternative) = outcomes
            .iter()
            .cloned()
            .max_by(|a, b| a.value.total_cmp(&b.value))
        else {
            return Ok(None);
        };
        let best_value = best_alternative.value;
        let regret = best_value - chosen_value;
        let regret_percent = if chosen_value == 0.0 {
            0.0
        } else {
            (regret / chosen_value.abs()) * 100.0
        };

        Ok(Some(RegretAnalysis {
            chosen_action: chosen_action.clone(),
            chosen_outcome,
            chosen_value,
            best_alternative,
            best_value,
            regret,
            regret_percent,
            all_alternatives: outcomes,
        }))
    }
}

/// Builds an alternative action with a rationale.
fn reasoned(kind: ActionKind, reason: &str) -> Action {
    let mut action = Action::new(kind);
    action.reason = Some(reason.to_string());
    action
}
