// crates/venture-sim-core/tests/registry.rs
// ============================================================================
// Module: Run Registry Tests
// Description: Lifecycle transitions and serialized registry operations.
// ============================================================================
//! ## Overview
//! One triple per run id, rejected duplicates, forward-only lifecycle, and a
//! coherent registry under concurrent creators.

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
use std::thread;

use venture_sim_core::Blueprint;
use venture_sim_core::Constraints;
use venture_sim_core::EngineConfig;
use venture_sim_core::InitialConditions;
use venture_sim_core::PolicyEngine;
use venture_sim_core::PolicySet;
use venture_sim_core::RegistryError;
use venture_sim_core::RunId;
use venture_sim_core::RunLifecycle;
use venture_sim_core::RunRegistry;
use venture_sim_core::SimTime;
use venture_sim_core::Timeline;

/// Baseline blueprint.
fn blueprint() -> Blueprint {
    Blueprint {
        industry: "saas".to_string(),
        initial_conditions: InitialConditions {
            cash: 1_000_000.0,
            monthly_burn: 100_000.0,
            pricing: BTreeMap::new(),
            margins: BTreeMap::new(),
            headcount: 10,
            capacity: BTreeMap::new(),
        },
        constraints: Constraints::default(),
        policies: PolicySet::default(),
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

/// Engine config for a run id.
fn config(run_id: &str) -> EngineConfig {
    EngineConfig::new(blueprint(), timeline(), 42, RunId::new(run_id))
}

/// Policy engine matching the blueprint.
fn policy() -> PolicyEngine {
    PolicyEngine::new(PolicySet::default(), Constraints::default())
}

#[test]
fn duplicate_run_id_is_rejected() {
    let registry = RunRegistry::new();
    registry.create(config("run-dup"), Vec::new(), policy()).expect("first");
    let err = registry.create(config("run-dup"), Vec::new(), policy()).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateRun { .. }));
}

#[test]
fn lifecycle_moves_forward_only() {
    let registry = RunRegistry::new();
    let run_id = RunId::new("run-life");
    registry.create(config("run-life"), Vec::new(), policy()).expect("create");

    assert_eq!(registry.lifecycle(&run_id).expect("state"), RunLifecycle::Created);
    registry.advance(&run_id, RunLifecycle::Running).expect("to running");
    registry.advance(&run_id, RunLifecycle::Completed).expect("to completed");

    let err = registry.advance(&run_id, RunLifecycle::Running).unwrap_err();
    assert!(matches!(err, RegistryError::IllegalTransition { .. }));
}

#[test]
fn terminate_requires_a_terminal_state() {
    let registry = RunRegistry::new();
    let run_id = RunId::new("run-term");
    registry.create(config("run-term"), Vec::new(), policy()).expect("create");
    registry.advance(&run_id, RunLifecycle::Running).expect("to running");

    let err = registry.terminate(&run_id).unwrap_err();
    assert!(matches!(err, RegistryError::IllegalTransition { .. }));

    registry.advance(&run_id, RunLifecycle::Failed).expect("to failed");
    registry.terminate(&run_id).expect("terminate");
    assert!(matches!(
        registry.get(&run_id),
        Err(RegistryError::RunNotFound { .. })
    ));
}

#[test]
fn run_started_is_audited_at_creation() {
    let registry = RunRegistry::new();
    let run_id = RunId::new("run-audit");
    let orch = registry.create(config("run-audit"), Vec::new(), policy()).expect("create");
    let entries = orch.ledger().entries(&run_id).expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sequence, 0);
}

#[test]
fn concurrent_creators_stay_coherent() {
    let registry = Arc::new(RunRegistry::new());
    let mut handles = Vec::new();
    for index in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            registry
                .create(config(&format!("run-{index}")), Vec::new(), policy())
                .expect("create");
        }));
    }
    for handle in handles {
        handle.join().expect("join");
    }
    assert_eq!(registry.run_ids().expect("ids").len(), 8);
}
