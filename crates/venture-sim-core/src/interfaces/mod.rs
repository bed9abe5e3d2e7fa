// crates/venture-sim-core/src/interfaces/mod.rs
// ============================================================================
// Module: Venture Sim Interfaces
// Description: Backend-agnostic interfaces for agents, industry models, and
//              durable ledger storage.
// Purpose: Define the contract surfaces used by the Venture Sim runtime.
// Dependencies: crate::core, crate::runtime::rng, async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the core integrates with external collaborators
//! without embedding backend specifics. Implementations must be deterministic
//! where they touch simulation state and must not call back into the engine
//! or ledger during a proposal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Action;
use crate::core::ActionKind;
use crate::core::AgentRole;
use crate::core::AuditEntry;
use crate::core::CompanyState;
use crate::core::Constraints;
use crate::core::RunId;
use crate::core::StateOverrides;
use crate::runtime::context::InformationContext;
use crate::runtime::rng::SimRng;

// ============================================================================
// SECTION: Industry Model
// ============================================================================

/// Numeric parameters consumed by industry models.
pub type IndustryParams = BTreeMap<String, f64>;

/// Industry model errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; the engine converts
///   failures into rejected transitions and continues.
#[derive(Debug, Error)]
pub enum IndustryError {
    /// Model reported an error.
    #[error("industry model error: {0}")]
    Model(String),
}

/// Pluggable per-tick business dynamics.
///
/// Implementations are pure with respect to their inputs: identical state,
/// elapsed days, parameters, and RNG state must produce identical overrides.
pub trait IndustryModel: Send + Sync {
    /// Industry label this model serves (`saas`, `d2c`, `manufacturing`).
    fn industry(&self) -> &str;

    /// Computes state overrides for one tick of `days_elapsed` days.
    ///
    /// # Errors
    ///
    /// Returns [`IndustryError`] when the model cannot produce overrides; the
    /// engine treats this as an invalid transition and keeps the prior state.
    fn update_state(
        &self,
        state: &CompanyState,
        days_elapsed: u32,
        params: &IndustryParams,
        rng: &mut SimRng,
    ) -> Result<StateOverrides, IndustryError>;
}

// ============================================================================
// SECTION: Agents
// ============================================================================

/// Market dynamics produced by the population agent's market pass.
///
/// # Invariants
/// - Score fields lie in `[0, 1]`; `viral_coefficient` in `[0, 2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDynamics {
    /// Aggregate market sentiment.
    pub sentiment_score: f64,
    /// Brand awareness level.
    pub awareness_level: f64,
    /// Market trust level.
    pub trust_level: f64,
    /// Organic-growth multiplier.
    pub viral_coefficient: f64,
    /// Market levers (demand multiplier and friends) for downstream agents.
    #[serde(default)]
    pub levers: BTreeMap<String, f64>,
}

/// Agent errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; a failed proposal is
///   treated as an empty proposal list.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent reported an error.
    #[error("agent error: {0}")]
    Agent(String),
}

/// Role-typed decision agent proposing actions against a time-locked view.
///
/// Implementations must not call back into the engine or ledger during
/// [`Agent::propose`]; they read the snapshot and return proposals.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Role of this agent.
    fn role(&self) -> AgentRole;

    /// Action types this agent is permitted to execute.
    fn permissions(&self) -> Vec<String>;

    /// Returns `true` when the agent may execute the given payload type.
    fn can_execute(&self, kind: &ActionKind) -> bool {
        self.permissions().iter().any(|permitted| permitted == kind.type_tag())
    }

    /// Market pass hook; only the population agent returns dynamics.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when market evaluation fails.
    async fn evaluate_market(
        &self,
        _state: &CompanyState,
        _context: &InformationContext,
    ) -> Result<Option<MarketDynamics>, AgentError> {
        Ok(None)
    }

    /// Proposes actions for one decision cycle.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the agent cannot produce proposals; the
    /// orchestrator records the failure and proceeds with an empty list.
    async fn propose(
        &self,
        context: &InformationContext,
        state: &CompanyState,
        constraints: &Constraints,
    ) -> Result<Vec<Action>, AgentError>;
}

// ============================================================================
// SECTION: Ledger Store
// ============================================================================

/// Durable ledger storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    /// Backing store reported an error.
    #[error("ledger store error: {0}")]
    Store(String),
}

/// Durable backing store mirroring the in-memory chain semantics.
///
/// Implementations must be idempotent on `(run_id, sequence)`: inserting an
/// existing position is a no-op, never an overwrite.
pub trait LedgerStore: Send + Sync {
    /// Persists an entry unless its position is already occupied.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when the store cannot be reached.
    fn insert_if_absent(
        &self,
        run_id: &RunId,
        sequence: u64,
        entry: &AuditEntry,
    ) -> Result<(), LedgerStoreError>;

    /// Loads the full entry chain for a run in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerStoreError`] when the store cannot be reached.
    fn load_entries(&self, run_id: &RunId) -> Result<Vec<AuditEntry>, LedgerStoreError>;
}
