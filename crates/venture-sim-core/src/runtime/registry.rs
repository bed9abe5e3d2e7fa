// crates/venture-sim-core/src/runtime/registry.rs
// ============================================================================
// Module: Venture Sim Run Registry
// Description: Lifecycle-managed ownership of engine/orchestrator/ledger triples.
// Purpose: Replace process-global run maps with an owned registry whose
//          operations are serialized.
// Dependencies: crate::core, crate::runtime::{engine, ledger, orchestrator,
//               policy}, serde
// ============================================================================

//! ## Overview
//! Each run owns an engine, an orchestrator, and a ledger, created together
//! and disposed together. The registry serializes `create`/`get`/`terminate`
//! and tracks the lifecycle `Created → Running → Completed/Failed → Disposed`.
//! Runs are fully independent: separate ledgers, RNG streams, time-lock keys,
//! and approval queues.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::EntryType;
use crate::core::RunId;
use crate::interfaces::Agent;
use crate::runtime::engine::EngineConfig;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::SimulationEngine;
use crate::runtime::ledger::AppendRequest;
use crate::runtime::ledger::AuditLedger;
use crate::runtime::ledger::LedgerError;
use crate::runtime::orchestrator::AgentOrchestrator;
use crate::runtime::policy::PolicyEngine;

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Run lifecycle state.
///
/// # Invariants
/// - Transitions only move forward: `Created → Running →
///   Completed | Failed → Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLifecycle {
    /// Triple constructed, no tick executed yet.
    Created,
    /// Ticks are executing.
    Running,
    /// Run reached its timeline end.
    Completed,
    /// Run halted on an integrity or runtime failure.
    Failed,
    /// Triple released; only the terminal record remains.
    Disposed,
}

impl RunLifecycle {
    /// Returns `true` when `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Running, Self::Completed | Self::Failed)
                | (Self::Created | Self::Completed | Self::Failed, Self::Disposed)
        )
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A run with this id already exists.
    #[error("run {run_id} already exists")]
    DuplicateRun {
        /// Offending run id.
        run_id: RunId,
    },
    /// No run with this id is registered.
    #[error("run {run_id} not found")]
    RunNotFound {
        /// Requested run id.
        run_id: RunId,
    },
    /// Requested lifecycle transition is not legal.
    #[error("run {run_id} cannot move {from:?} -> {to:?}")]
    IllegalTransition {
        /// Run id.
        run_id: RunId,
        /// Current lifecycle state.
        from: RunLifecycle,
        /// Requested lifecycle state.
        to: RunLifecycle,
    },
    /// Registry lock was poisoned.
    #[error("registry lock poisoned")]
    LockPoisoned,
    /// Engine construction failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Ledger write failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ============================================================================
// SECTION: Run Handles
// ============================================================================

/// One registered run: its orchestrator (owning the engine) and lifecycle.
#[derive(Debug)]
struct RunHandle {
    /// Orchestrator owning the engine and ledger references.
    orchestrator: Arc<AgentOrchestrator>,
    /// Current lifecycle state.
    lifecycle: RunLifecycle,
}

// ============================================================================
// SECTION: Run Registry
// ============================================================================

/// Serialized registry of live runs.
///
/// # Invariants
/// - One triple per run id; duplicate creation is rejected.
/// - All operations go through the registry lock.
#[derive(Debug, Default)]
pub struct RunRegistry {
    /// Registered runs by id.
    runs: Mutex<BTreeMap<RunId, RunHandle>>,
}

impl RunRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a run triple: engine from the config, ledger keyed to the run,
    /// orchestrator owning both. Audits the run start.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRun`] when the id is taken and
    /// engine/ledger errors otherwise.
    pub fn create(
        &self,
        config: EngineConfig,
        agents: Vec<Arc<dyn Agent>>,
        policy: PolicyEngine,
    ) -> Result<Arc<AgentOrchestrator>, RegistryError> {
        let run_id = config.run_id.clone();
        let mut runs = self.runs.lock().map_err(|_| RegistryError::LockPoisoned)?;
        if runs.contains_key(&run_id) {
            return Err(RegistryError::DuplicateRun {
                run_id,
            });
        }

        let engine = SimulationEngine::new(config)?;
        let ledger = Arc::new(AuditLedger::new(engine.signing_key().clone()));
        let start_time = engine.current_time();
        ledger.append(AppendRequest {
            run_id: run_id.clone(),
            wall_time: start_time,
            sim_time: start_time,
            entry_type: EntryType::RunStarted,
            agent_role: None,
            data: serde_json::json!({
                "id": format!("run-started-{run_id}"),
                "run_id": run_id.as_str(),
            }),
        })?;

        let orchestrator =
            Arc::new(AgentOrchestrator::new(engine, agents, policy, Arc::clone(&ledger)));
        runs.insert(
            run_id,
            RunHandle {
                orchestrator: Arc::clone(&orchestrator),
                lifecycle: RunLifecycle::Created,
            },
        );
        Ok(orchestrator)
    }

    /// Returns the orchestrator for a run.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RunNotFound`] for unknown or disposed runs.
    pub fn get(&self, run_id: &RunId) -> Result<Arc<AgentOrchestrator>, RegistryError> {
        let runs = self.runs.lock().map_err(|_| RegistryError::LockPoisoned)?;
        runs.get(run_id)
            .filter(|handle| handle.lifecycle != RunLifecycle::Disposed)
            .map(|handle| Arc::clone(&handle.orchestrator))
            .ok_or_else(|| RegistryError::RunNotFound {
                run_id: run_id.clone(),
            })
    }

    /// Current lifecycle state of a run.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RunNotFound`] for unknown runs.
    pub fn lifecycle(&self, run_id: &RunId) -> Result<RunLifecycle, RegistryError> {
        let runs = self.runs.lock().map_err(|_| RegistryError::LockPoisoned)?;
        runs.get(run_id).map(|handle| handle.lifecycle).ok_or_else(|| {
            RegistryError::RunNotFound {
                run_id: run_id.clone(),
            }
        })
    }

    /// Advances a run's lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IllegalTransition`] on a backward move and
    /// [`RegistryError::RunNotFound`] for unknown runs.
    pub fn advance(&self, run_id: &RunId, to: RunLifecycle) -> Result<(), RegistryError> {
        let mut runs = self.runs.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let handle = runs.get_mut(run_id).ok_or_else(|| RegistryError::RunNotFound {
            run_id: run_id.clone(),
        })?;
        if !handle.lifecycle.can_advance_to(to) {
            return Err(RegistryError::IllegalTransition {
                run_id: run_id.clone(),
                from: handle.lifecycle,
                to,
            });
        }
        handle.lifecycle = to;
        Ok(())
    }

    /// Terminates a run: marks it disposed and releases the triple.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RunNotFound`] for unknown runs and
    /// [`RegistryError::IllegalTransition`] when the run is mid-tick
    /// (`Running`); complete or fail it first.
    pub fn terminate(&self, run_id: &RunId) -> Result<(), RegistryError> {
        let mut runs = self.runs.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let handle = runs.get_mut(run_id).ok_or_else(|| RegistryError::RunNotFound {
            run_id: run_id.clone(),
        })?;
        if !handle.lifecycle.can_advance_to(RunLifecycle::Disposed) {
            return Err(RegistryError::IllegalTransition {
                run_id: run_id.clone(),
                from: handle.lifecycle,
                to: RunLifecycle::Disposed,
            });
        }
        runs.remove(run_id);
        Ok(())
    }

    /// Ids of every registered run.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] when the registry lock failed.
    pub fn run_ids(&self) -> Result<Vec<RunId>, RegistryError> {
        let runs = self.runs.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(runs.keys().cloned().collect())
    }
}
