// crates/venture-sim-core/src/lib.rs
// ============================================================================
// Module: Venture Sim Core
// Description: Deterministic company-simulation core with policy gating and a
//              tamper-evident audit trail.
// Purpose: Provide the engine, time-lock, policy gate, ledger, orchestrator,
//          and registry composing one replayable run.
// Dependencies: crate modules
// ============================================================================

//! ## Overview
//! Venture Sim simulates a company over wall-clock dates in discrete ticks.
//! Role-typed agents observe a time-locked world view, propose actions through
//! a policy gate, and approved actions commit to an immutable, signed audit
//! chain. The core guarantees deterministic replay from seed + inputs,
//! at-most-once application of any identified action, future-blindness of
//! agent inputs, and tamper-evidence of the decision record.
//!
//! HTTP surfaces, persistence schemas, auth/tenancy, and LLM adapters are
//! external collaborators integrating through [`interfaces`].

/// Canonical data model.
pub mod core;
/// Collaborator contract surfaces.
pub mod interfaces;
/// Deterministic simulation runtime.
pub mod runtime;

pub use crate::core::Action;
pub use crate::core::ActionId;
pub use crate::core::ActionKind;
pub use crate::core::AgentRole;
pub use crate::core::AuditBundle;
pub use crate::core::AuditEntry;
pub use crate::core::Blueprint;
pub use crate::core::CheckpointName;
pub use crate::core::CompanyState;
pub use crate::core::Constraints;
pub use crate::core::EntryType;
pub use crate::core::Event;
pub use crate::core::EventId;
pub use crate::core::HashAlgorithm;
pub use crate::core::HashDigest;
pub use crate::core::InitialConditions;
pub use crate::core::InputError;
pub use crate::core::MaxPercentChange;
pub use crate::core::ParameterImpacts;
pub use crate::core::PolicySet;
pub use crate::core::ProductId;
pub use crate::core::RunId;
pub use crate::core::Signal;
pub use crate::core::SimTime;
pub use crate::core::SlaTargets;
pub use crate::core::StateOverrides;
pub use crate::core::StateTransition;
pub use crate::core::Timeline;
pub use crate::core::TimelineEvent;
pub use crate::core::TransitionViolation;
pub use crate::core::hashing;
pub use crate::interfaces::Agent;
pub use crate::interfaces::AgentError;
pub use crate::interfaces::IndustryError;
pub use crate::interfaces::IndustryModel;
pub use crate::interfaces::IndustryParams;
pub use crate::interfaces::LedgerStore;
pub use crate::interfaces::LedgerStoreError;
pub use crate::interfaces::MarketDynamics;
pub use crate::runtime::ActionResult;
pub use crate::runtime::ActionStatus;
pub use crate::runtime::AgentOrchestrator;
pub use crate::runtime::AlternativeOutcome;
pub use crate::runtime::AppendRequest;
pub use crate::runtime::ApplyOutcome;
pub use crate::runtime::AuditLedger;
pub use crate::runtime::Checkpoint;
pub use crate::runtime::CheckpointPayload;
pub use crate::runtime::CounterfactualEngine;
pub use crate::runtime::EngineConfig;
pub use crate::runtime::EngineError;
pub use crate::runtime::ImpactExpiry;
pub use crate::runtime::InformationContext;
pub use crate::runtime::InvariantViolation;
pub use crate::runtime::LedgerError;
pub use crate::runtime::Metrics;
pub use crate::runtime::OrchestratorError;
pub use crate::runtime::PendingApproval;
pub use crate::runtime::PolicyDecision;
pub use crate::runtime::PolicyEngine;
pub use crate::runtime::PolicyResult;
pub use crate::runtime::RegistryError;
pub use crate::runtime::RegretAnalysis;
pub use crate::runtime::RegretMetric;
pub use crate::runtime::RunLifecycle;
pub use crate::runtime::RunRegistry;
pub use crate::runtime::SimRng;
pub use crate::runtime::SimulationEngine;
pub use crate::runtime::TimeLock;
pub use crate::runtime::TimelockError;
pub use crate::runtime::verify_bundle;
