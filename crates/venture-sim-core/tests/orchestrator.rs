// crates/venture-sim-core/tests/orchestrator.rs
// ============================================================================
// Module: Orchestrator Tests
// Description: Decision cycles, permissions, escalation, and deadlines.
// ============================================================================
//! ## Overview
//! Exercises the full decision cycle with stub agents: population-first
//! market enrichment, permission denial, policy escalation into the approval
//! queue, out-of-band approval, deadline timeouts, and audit coverage.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use venture_sim_core::Action;
use venture_sim_core::ActionKind;
use venture_sim_core::ActionStatus;
use venture_sim_core::Agent;
use venture_sim_core::AgentError;
use venture_sim_core::AgentOrchestrator;
use venture_sim_core::AgentRole;
use venture_sim_core::AuditLedger;
use venture_sim_core::Blueprint;
use venture_sim_core::CompanyState;
use venture_sim_core::Constraints;
use venture_sim_core::EngineConfig;
use venture_sim_core::EntryType;
use venture_sim_core::InformationContext;
use venture_sim_core::InitialConditions;
use venture_sim_core::MarketDynamics;
use venture_sim_core::PolicyEngine;
use venture_sim_core::PolicySet;
use venture_sim_core::RunId;
use venture_sim_core::SimTime;
use venture_sim_core::SimulationEngine;
use venture_sim_core::Timeline;

// ============================================================================
// SECTION: Stub Agents
// ============================================================================

/// Agent returning a fixed list of actions.
struct ScriptedAgent {
    /// Agent role.
    role: AgentRole,
    /// Permitted action types.
    permissions: Vec<String>,
    /// Actions returned by every proposal.
    actions: Vec<Action>,
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn role(&self) -> AgentRole {
        self.role.clone()
    }

    fn permissions(&self) -> Vec<String> {
        self.permissions.clone()
    }

    async fn propose(
        &self,
        _context: &InformationContext,
        _state: &CompanyState,
        _constraints: &Constraints,
    ) -> Result<Vec<Action>, AgentError> {
        Ok(self.actions.clone())
    }
}

/// Agent that sleeps past any reasonable deadline.
struct SleepyAgent;

#[async_trait]
impl Agent for SleepyAgent {
    fn role(&self) -> AgentRole {
        AgentRole::new("coo")
    }

    fn permissions(&self) -> Vec<String> {
        vec!["adjust_hiring".to_string()]
    }

    async fn propose(
        &self,
        _context: &InformationContext,
        _state: &CompanyState,
        _constraints: &Constraints,
    ) -> Result<Vec<Action>, AgentError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![Action::new(ActionKind::AdjustHiring {
            delta: 1,
            cost_per_head: 10_000.0,
        })])
    }
}

/// Population agent publishing fixed market dynamics.
struct MarketAgent;

#[async_trait]
impl Agent for MarketAgent {
    fn role(&self) -> AgentRole {
        AgentRole::new(AgentRole::POPULATION)
    }

    fn permissions(&self) -> Vec<String> {
        Vec::new()
    }

    async fn evaluate_market(
        &self,
        _state: &CompanyState,
        _context: &InformationContext,
    ) -> Result<Option<MarketDynamics>, AgentError> {
        Ok(Some(MarketDynamics {
            sentiment_score: 0.6,
            awareness_level: 0.2,
            trust_level: 0.55,
            viral_coefficient: 1.2,
            levers: BTreeMap::from([("demand_multiplier".to_string(), 1.1)]),
        }))
    }

    async fn propose(
        &self,
        _context: &InformationContext,
        _state: &CompanyState,
        _constraints: &Constraints,
    ) -> Result<Vec<Action>, AgentError> {
        Ok(Vec::new())
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Baseline blueprint.
fn blueprint(policies: PolicySet) -> Blueprint {
    Blueprint {
        industry: "saas".to_string(),
        initial_conditions: InitialConditions {
            cash: 5_000_000.0,
            monthly_burn: 200_000.0,
            pricing: BTreeMap::new(),
            margins: BTreeMap::new(),
            headcount: 20,
            capacity: BTreeMap::new(),
        },
        constraints: Constraints::default(),
        policies,
        market_exposure: None,
        industry_params: BTreeMap::new(),
    }
}

/// Empty 2020 timeline.
fn timeline() -> Timeline {
    Timeline {
        start_date: SimTime::parse("2020-01-01T00:00:00Z").expect("start"),
        end_date: SimTime::parse("2020-12-31T00:00:00Z").expect("end"),
        events: Vec::new(),
    }
}

/// Builds an orchestrator over the given agents and policies.
fn orchestrator(
    run_id: &str,
    agents: Vec<Arc<dyn Agent>>,
    policies: PolicySet,
) -> AgentOrchestrator {
    let bp = blueprint(policies.clone());
    let constraints = bp.constraints.clone();
    let engine =
        SimulationEngine::new(EngineConfig::new(bp, timeline(), 42, RunId::new(run_id)))
            .expect("engine");
    let ledger = Arc::new(AuditLedger::new(engine.signing_key().clone()));
    AgentOrchestrator::new(engine, agents, PolicyEngine::new(policies, constraints), ledger)
}

// ============================================================================
// SECTION: Cycle Tests
// ============================================================================

#[tokio::test]
async fn approved_action_is_applied_and_audited() {
    let agent = Arc::new(ScriptedAgent {
        role: AgentRole::new("cfo"),
        permissions: vec!["trigger_cost_cutting".to_string()],
        actions: vec![Action::new(ActionKind::TriggerCostCutting {
            reduction_percent: 0.1,
        })],
    });
    let orch = orchestrator("run-apply", vec![agent], PolicySet::default());

    let results = orch.run_decision_cycle().await.expect("cycle");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ActionStatus::Applied);

    let engine = orch.engine().await;
    assert_eq!(engine.state().costs_monthly, 180_000.0);
    drop(engine);

    let entries = orch.ledger().entries(&RunId::new("run-apply")).expect("entries");
    let types: Vec<EntryType> = entries.iter().map(|entry| entry.entry_type).collect();
    assert!(types.contains(&EntryType::ActionProposed));
    assert!(types.contains(&EntryType::ActionApproved));
    assert!(types.contains(&EntryType::ActionApplied));
    assert!(orch.ledger().verify_chain(&RunId::new("run-apply")).expect("verify"));
}

#[tokio::test]
async fn action_outside_permissions_is_denied() {
    let agent = Arc::new(ScriptedAgent {
        role: AgentRole::new("ceo"),
        permissions: vec!["change_pricing".to_string()],
        actions: vec![Action::new(ActionKind::TriggerCostCutting {
            reduction_percent: 0.5,
        })],
    });
    let orch = orchestrator("run-perm", vec![agent], PolicySet::default());

    let results = orch.run_decision_cycle().await.expect("cycle");
    assert_eq!(results[0].status, ActionStatus::Denied);
    assert_eq!(results[0].reason, "insufficient permissions");

    let engine = orch.engine().await;
    assert_eq!(engine.state().costs_monthly, 200_000.0, "state must be untouched");
}

#[tokio::test]
async fn escalated_action_waits_for_approval_then_applies_once() {
    let agent = Arc::new(ScriptedAgent {
        role: AgentRole::new("cfo"),
        permissions: vec!["trigger_cost_cutting".to_string()],
        actions: vec![{
            let mut action = Action::new(ActionKind::TriggerCostCutting {
                reduction_percent: 0.1,
            });
            action.estimated_impact = Some(500_000.0);
            action
        }],
    });
    let orch = orchestrator(
        "run-esc",
        vec![agent],
        PolicySet {
            approval_threshold: Some(100_000.0),
            ..PolicySet::default()
        },
    );

    let results = orch.run_decision_cycle().await.expect("cycle");
    assert_eq!(results[0].status, ActionStatus::PendingApproval);

    let pending = orch.pending_approvals().expect("pending");
    assert_eq!(pending.len(), 1);
    let action_id = pending[0].action.id.clone().expect("id");

    assert!(orch.approve_action(&action_id, "board").await.expect("approve"));
    assert!(orch.pending_approvals().expect("pending").is_empty());

    let engine = orch.engine().await;
    assert_eq!(engine.state().costs_monthly, 180_000.0);
    drop(engine);

    // A second approval attempt finds nothing to approve.
    assert!(!orch.approve_action(&action_id, "board").await.expect("approve again"));
}

#[tokio::test]
async fn sleepy_agent_contributes_empty_proposal_list() {
    let sleepy: Arc<dyn Agent> = Arc::new(SleepyAgent);
    let prompt: Arc<dyn Agent> = Arc::new(ScriptedAgent {
        role: AgentRole::new("cfo"),
        permissions: vec!["trigger_cost_cutting".to_string()],
        actions: vec![Action::new(ActionKind::TriggerCostCutting {
            reduction_percent: 0.1,
        })],
    });
    let orch = orchestrator("run-sleep", vec![sleepy, prompt], PolicySet::default())
        .with_proposal_deadline(Duration::from_millis(50));

    let results = orch.run_decision_cycle().await.expect("cycle");
    assert_eq!(results.len(), 1, "only the prompt agent contributes");
    assert_eq!(results[0].status, ActionStatus::Applied);
}

#[tokio::test]
async fn population_pass_enriches_context_and_is_audited() {
    let population: Arc<dyn Agent> = Arc::new(MarketAgent);
    let orch = orchestrator("run-pop", vec![population], PolicySet::default());

    let results = orch.run_decision_cycle().await.expect("cycle");
    assert!(results.is_empty());

    let entries = orch.ledger().entries(&RunId::new("run-pop")).expect("entries");
    assert!(entries.iter().any(|entry| entry.entry_type == EntryType::MarketObserved));
}

#[tokio::test]
async fn gating_order_matches_result_order() {
    let cfo = Arc::new(ScriptedAgent {
        role: AgentRole::new("cfo"),
        permissions: vec!["trigger_cost_cutting".to_string(), "allocate_budget".to_string()],
        actions: vec![
            Action::new(ActionKind::TriggerCostCutting {
                reduction_percent: 0.1,
            }),
            Action::new(ActionKind::AllocateBudget {
                allocation: BTreeMap::from([("ads".to_string(), 10_000.0)]),
            }),
        ],
    });
    let orch = orchestrator("run-order", vec![cfo], PolicySet::default());

    let results = orch.run_decision_cycle().await.expect("cycle");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].action.kind.type_tag(), "trigger_cost_cutting");
    assert_eq!(results[1].action.kind.type_tag(), "allocate_budget");
}
