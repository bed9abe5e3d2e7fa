// crates/venture-sim-core/src/runtime/mod.rs
// ============================================================================
// Module: Venture Sim Runtime
// Description: Deterministic simulation runtime composed from the core types.
// Purpose: Re-export the engine, time-lock, ledger, policy, orchestrator, and
//          registry surfaces.
// Dependencies: crate submodules
// ============================================================================

//! ## Overview
//! The runtime composes the data model into a running system: seeded RNG and
//! derived keys, the future-blind time-lock, the signature-chained ledger,
//! the policy gate, the tick-loop engine, counterfactual rollouts, the
//! multi-agent orchestrator, and the run registry.

/// Time-locked information contexts.
pub mod context;
/// Counterfactual alternatives and regret scoring.
pub mod counterfactual;
/// Tick-loop simulation engine.
pub mod engine;
/// Per-run key derivation.
pub mod keys;
/// Signature-chained audit ledger.
pub mod ledger;
/// Multi-agent decision cycles.
pub mod orchestrator;
/// Pre-commit policy gate and invariants.
pub mod policy;
/// Run registry and lifecycle.
pub mod registry;
/// Deterministic RNG.
pub mod rng;
/// Future-blindness enforcement.
pub mod timelock;

pub use context::EventSummary;
pub use context::InformationContext;
pub use counterfactual::AlternativeOutcome;
pub use counterfactual::CounterfactualEngine;
pub use counterfactual::RegretAnalysis;
pub use counterfactual::RegretMetric;
pub use engine::ApplyOutcome;
pub use engine::Checkpoint;
pub use engine::CheckpointPayload;
pub use engine::EngineConfig;
pub use engine::EngineError;
pub use engine::ImpactExpiry;
pub use engine::Metrics;
pub use engine::SimulationEngine;
pub use keys::RunKeys;
pub use ledger::AppendRequest;
pub use ledger::AuditLedger;
pub use ledger::LedgerError;
pub use ledger::verify_bundle;
pub use orchestrator::ActionResult;
pub use orchestrator::ActionStatus;
pub use orchestrator::AgentOrchestrator;
pub use orchestrator::OrchestratorError;
pub use orchestrator::PendingApproval;
pub use policy::InvariantViolation;
pub use policy::PolicyDecision;
pub use policy::PolicyEngine;
pub use policy::PolicyResult;
pub use registry::RegistryError;
pub use registry::RunLifecycle;
pub use registry::RunRegistry;
pub use rng::SimRng;
pub use timelock::TimeLock;
pub use timelock::TimelockError;
