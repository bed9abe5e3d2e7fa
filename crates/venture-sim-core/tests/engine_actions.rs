// crates/venture-sim-core/tests/engine_actions.rs
// ============================================================================
// Module: Engine Action Tests
// Description: Action semantics, idempotence, and transition invariants.
// ============================================================================
//! ## Overview
//! Exercises the action funnel: the five payload types, at-most-once
//! application by id, rejected transitions leaving state untouched, and event
//! impact application with both expiry modes.

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

use venture_sim_core::Action;
use venture_sim_core::ActionKind;
use venture_sim_core::ApplyOutcome;
use venture_sim_core::Blueprint;
use venture_sim_core::EngineConfig;
use venture_sim_core::Event;
use venture_sim_core::ImpactExpiry;
use venture_sim_core::InitialConditions;
use venture_sim_core::ParameterImpacts;
use venture_sim_core::ProductId;
use venture_sim_core::RunId;
use venture_sim_core::SimTime;
use venture_sim_core::SimulationEngine;
use venture_sim_core::Timeline;

/// Baseline blueprint for action tests.
fn blueprint() -> Blueprint {
    Blueprint {
        industry: "saas".to_string(),
        initial_conditions: InitialConditions {
            cash: 5_000_000.0,
            monthly_burn: 200_000.0,
            pricing: BTreeMap::from([(ProductId::new("basic"), 100.0)]),
            margins: BTreeMap::new(),
            headcount: 20,
            capacity: BTreeMap::new(),
        },
        constraints: venture_sim_core::Constraints::default(),
        policies: venture_sim_core::PolicySet::default(),
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

/// Engine with seed 42.
fn engine() -> SimulationEngine {
    SimulationEngine::new(EngineConfig::new(blueprint(), timeline(), 42, RunId::new("run-act")))
        .expect("engine")
}

#[test]
fn adjust_hiring_applies_once_under_one_id() {
    let mut sim = engine();
    let action = Action::new(ActionKind::AdjustHiring {
        delta: 5,
        cost_per_head: 10_000.0,
    })
    .with_id("a1");

    let first = sim.apply_action(&action, None);
    assert!(matches!(first, ApplyOutcome::Applied { .. }));
    assert_eq!(sim.state().headcount, 25);
    assert_eq!(sim.state().costs_monthly, 250_000.0);

    let again = sim.apply_action(&action, None);
    assert!(matches!(again, ApplyOutcome::AlreadyApplied { .. }));
    assert_eq!(sim.state().headcount, 25);
    assert_eq!(sim.state().costs_monthly, 250_000.0);
}

#[test]
fn idempotent_apply_leaves_state_hash_unchanged() {
    let mut sim = engine();
    let action = Action::new(ActionKind::AdjustHiring {
        delta: 3,
        cost_per_head: 8_000.0,
    })
    .with_id("a2");

    sim.apply_action(&action, None);
    let hash_after_first = sim.state().hash().expect("hash");
    sim.apply_action(&action, None);
    assert_eq!(sim.state().hash().expect("hash"), hash_after_first);
}

#[test]
fn headcount_clamps_at_zero() {
    let mut sim = engine();
    let action = Action::new(ActionKind::AdjustHiring {
        delta: -100,
        cost_per_head: 0.0,
    })
    .with_id("a3");

    let outcome = sim.apply_action(&action, None);
    assert!(outcome.is_applied());
    assert_eq!(sim.state().headcount, 0);
}

#[test]
fn change_pricing_overlays_only_listed_products() {
    let mut sim = engine();
    let action = Action::new(ActionKind::ChangePricing {
        pricing: BTreeMap::from([(ProductId::new("pro"), 250.0)]),
    })
    .with_id("a4");

    assert!(sim.apply_action(&action, None).is_applied());
    assert_eq!(sim.state().pricing.get(&ProductId::new("basic")), Some(&100.0));
    assert_eq!(sim.state().pricing.get(&ProductId::new("pro")), Some(&250.0));
}

#[test]
fn allocate_budget_spends_cash() {
    let mut sim = engine();
    let action = Action::new(ActionKind::AllocateBudget {
        allocation: BTreeMap::from([
            ("ads".to_string(), 100_000.0),
            ("ops".to_string(), 50_000.0),
        ]),
    })
    .with_id("a5");

    assert!(sim.apply_action(&action, None).is_applied());
    assert_eq!(sim.state().cash, 4_850_000.0);
}

#[test]
fn allocate_budget_beyond_cash_changes_nothing_but_commits() {
    let mut sim = engine();
    let action = Action::new(ActionKind::AllocateBudget {
        allocation: BTreeMap::from([("ads".to_string(), 6_000_000.0)]),
    })
    .with_id("a6");

    let outcome = sim.apply_action(&action, None);
    assert!(outcome.is_applied());
    assert_eq!(sim.state().cash, 5_000_000.0, "overspend leaves cash untouched");
}

#[test]
fn modify_inventory_policy_overlays_inventory() {
    let mut sim = engine();
    let action = Action::new(ActionKind::ModifyInventoryPolicy {
        inventory: BTreeMap::from([(ProductId::new("default"), 1_500.0)]),
    })
    .with_id("a7");

    assert!(sim.apply_action(&action, None).is_applied());
    assert_eq!(sim.state().inventory.get(&ProductId::new("default")), Some(&1_500.0));
}

#[test]
fn trigger_cost_cutting_scales_costs() {
    let mut sim = engine();
    let action = Action::new(ActionKind::TriggerCostCutting {
        reduction_percent: 0.25,
    })
    .with_id("a8");

    assert!(sim.apply_action(&action, None).is_applied());
    assert_eq!(sim.state().costs_monthly, 150_000.0);
}

#[test]
fn version_is_monotone_across_commits() {
    let mut sim = engine();
    let before = sim.state().version;
    sim.apply_action(
        &Action::new(ActionKind::TriggerCostCutting {
            reduction_percent: 0.1,
        })
        .with_id("a9"),
        None,
    );
    assert_eq!(sim.state().version, before + 1);
    assert!(sim.tick().expect("tick"));
    assert!(sim.state().version > before + 1);
}

#[test]
fn actions_without_id_get_minted_ids() {
    let mut sim = engine();
    let outcome = sim.apply_action(
        &Action::new(ActionKind::TriggerCostCutting {
            reduction_percent: 0.05,
        }),
        None,
    );
    assert!(outcome.is_applied());
    assert_eq!(outcome.action_id().as_str(), "act-1");
}

// ============================================================================
// SECTION: Transition Rules
// ============================================================================

#[test]
fn transition_rules_catch_regressions() {
    use venture_sim_core::StateTransition;
    use venture_sim_core::TransitionViolation;

    let sim = engine();
    let before = sim.state().clone();

    // A candidate that skips a version and moves time backwards.
    let mut after = before.clone();
    after.version = before.version + 2;
    after.timestamp = SimTime::parse("2019-12-01T00:00:00Z").expect("time");
    after.cash = -1.0;

    let transition = StateTransition {
        before,
        after,
        action: Action::new(ActionKind::TriggerCostCutting {
            reduction_percent: 0.1,
        }),
        agent_role: None,
        reason: String::new(),
        committed_at: SimTime::parse("2020-01-01T00:00:00Z").expect("time"),
    };
    let violations = transition.violations();
    assert!(violations.contains(&TransitionViolation::NegativeCash));
    assert!(violations.contains(&TransitionViolation::VersionNotIncremented));
    assert!(violations.contains(&TransitionViolation::TimestampRegressed));
    assert!(!transition.is_valid());
}

// ============================================================================
// SECTION: Event Impacts
// ============================================================================

/// Timeline with one cost-shock event in February.
fn shock_timeline() -> Timeline {
    Timeline {
        start_date: SimTime::parse("2020-01-01T00:00:00Z").expect("start"),
        end_date: SimTime::parse("2020-12-31T00:00:00Z").expect("end"),
        events: vec![Event {
            id: None,
            timestamp: SimTime::parse("2020-02-01T00:00:00Z").expect("ts"),
            event_type: "supply_shock".to_string(),
            severity: 0.6,
            duration_days: 14,
            affected_areas: std::collections::BTreeSet::new(),
            signals: Vec::new(),
            parameter_impacts: ParameterImpacts {
                cost_multiplier: Some(2.0),
                churn_delta: Some(0.05),
                ..ParameterImpacts::default()
            },
        }],
    }
}

#[test]
fn event_impacts_apply_on_activation() {
    let config =
        EngineConfig::new(blueprint(), shock_timeline(), 7, RunId::new("run-shock"));
    let mut sim = SimulationEngine::new(config).expect("engine");

    // 5 weekly ticks reach Feb 5; the event activates on the crossing tick.
    for _ in 0..5 {
        assert!(sim.tick().expect("tick"));
    }
    assert_eq!(sim.state().costs_monthly, 400_000.0);
    assert_eq!(sim.state().churn_rate, 0.05);
}

#[test]
fn permanent_expiry_keeps_impacts() {
    let config =
        EngineConfig::new(blueprint(), shock_timeline(), 7, RunId::new("run-perm"));
    let mut sim = SimulationEngine::new(config).expect("engine");
    for _ in 0..10 {
        assert!(sim.tick().expect("tick"));
    }
    // Event expired after 14 days; impacts remain under permanent expiry.
    assert_eq!(sim.state().costs_monthly, 400_000.0);
    assert_eq!(sim.state().churn_rate, 0.05);
}

#[test]
fn transient_expiry_inverts_impacts() {
    let mut config =
        EngineConfig::new(blueprint(), shock_timeline(), 7, RunId::new("run-trans"));
    config.impact_expiry = ImpactExpiry::Transient;
    let mut sim = SimulationEngine::new(config).expect("engine");
    for _ in 0..10 {
        assert!(sim.tick().expect("tick"));
    }
    assert_eq!(sim.state().costs_monthly, 200_000.0);
    assert_eq!(sim.state().churn_rate, 0.0);
}
