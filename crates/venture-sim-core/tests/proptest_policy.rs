// crates/venture-sim-core/tests/proptest_policy.rs
// ============================================================================
// Module: Policy & State Property Tests
// Description: Property coverage for gate priority and snapshot evolution.
// ============================================================================
//! ## Overview
//! Randomized coverage of the safety-first gate (DENY beats ESCALATE under
//! any threshold combination), version monotonicity under arbitrary
//! overrides, and state-hash stability.

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

use proptest::prelude::*;
use venture_sim_core::Action;
use venture_sim_core::ActionKind;
use venture_sim_core::CompanyState;
use venture_sim_core::Constraints;
use venture_sim_core::PolicyDecision;
use venture_sim_core::PolicyEngine;
use venture_sim_core::PolicySet;
use venture_sim_core::SimTime;
use venture_sim_core::StateOverrides;

/// Baseline state for property evaluation.
fn state() -> CompanyState {
    CompanyState {
        timestamp: SimTime::parse("2020-01-01T00:00:00Z").expect("time"),
        version: 0,
        cash: 1_000_000.0,
        revenue_monthly: 100_000.0,
        costs_monthly: 150_000.0,
        margin: 0.6,
        headcount: 10,
        capacity: BTreeMap::new(),
        utilization: BTreeMap::new(),
        demand: BTreeMap::new(),
        pricing: BTreeMap::new(),
        cac: BTreeMap::new(),
        churn_rate: 0.02,
        inventory: BTreeMap::new(),
        backlog: BTreeMap::new(),
        lead_times: BTreeMap::new(),
        service_level: 0.98,
        risk_flags: BTreeMap::new(),
        compliance_score: 1.0,
        metadata: BTreeMap::new(),
    }
}

proptest! {
    /// A hard-constraint violation forces DENY no matter how large the
    /// impact or risk signals are.
    #[test]
    fn deny_beats_escalate_for_any_thresholds(
        overspend in 1.0f64..1_000_000.0,
        impact in 0.0f64..10_000_000.0,
        risk in 0.0f64..1.0,
        threshold in 0.0f64..100_000.0,
        appetite in 0.0f64..1.0,
    ) {
        let limit = 50_000.0;
        let engine = PolicyEngine::new(
            PolicySet {
                spend_limit_monthly: Some(limit),
                approval_threshold: Some(threshold),
                risk_appetite: Some(appetite),
                ..PolicySet::default()
            },
            Constraints::default(),
        );
        let mut action = Action::new(ActionKind::AllocateBudget {
            allocation: BTreeMap::from([("line".to_string(), limit + overspend)]),
        });
        action.estimated_impact = Some(impact);
        action.risk_score = Some(risk);

        let result = engine.evaluate_action(&action, &state(), None);
        prop_assert_eq!(result.decision, PolicyDecision::Deny);
        prop_assert!(!result.violated_rules.is_empty());
    }

    /// Within-limit allocations never produce violations; the outcome is
    /// either approval or an explicit escalation.
    #[test]
    fn compliant_spend_never_collects_violations(
        spend in 0.0f64..50_000.0,
        impact in 0.0f64..10_000_000.0,
        threshold in 0.0f64..100_000.0,
    ) {
        let engine = PolicyEngine::new(
            PolicySet {
                spend_limit_monthly: Some(50_000.0),
                approval_threshold: Some(threshold),
                ..PolicySet::default()
            },
            Constraints::default(),
        );
        let mut action = Action::new(ActionKind::AllocateBudget {
            allocation: BTreeMap::from([("line".to_string(), spend)]),
        });
        action.estimated_impact = Some(impact);

        let result = engine.evaluate_action(&action, &state(), None);
        prop_assert!(result.violated_rules.is_empty());
        prop_assert_ne!(result.decision, PolicyDecision::Deny);
    }

    /// Any override application bumps the version by exactly one.
    #[test]
    fn clone_with_increments_version(
        cash in -1_000_000.0f64..1_000_000.0,
        headcount in 0u64..10_000,
        churn in 0.0f64..1.0,
    ) {
        let base = state();
        let next = base.clone_with(StateOverrides {
            cash: Some(cash),
            headcount: Some(headcount),
            churn_rate: Some(churn),
            ..StateOverrides::default()
        });
        prop_assert_eq!(next.version, base.version + 1);
        prop_assert_eq!(next.cash, cash);
        prop_assert_eq!(next.headcount, headcount);
    }

    /// Hashing the same snapshot twice is stable, and any cash change moves
    /// the digest.
    #[test]
    fn state_hash_tracks_content(delta in 1.0f64..1_000.0) {
        let base = state();
        let same = base.clone();
        prop_assert_eq!(base.hash().expect("hash"), same.hash().expect("hash"));

        let changed = base.clone_with(StateOverrides {
            cash: Some(base.cash + delta),
            ..StateOverrides::default()
        });
        prop_assert_ne!(base.hash().expect("hash"), changed.hash().expect("hash"));
    }
}
