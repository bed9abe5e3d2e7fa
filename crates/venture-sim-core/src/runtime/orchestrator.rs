// crates/venture-sim-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Venture Sim Agent Orchestrator
// Description: Ordered multi-agent decision cycles over one engine.
// Purpose: Run the population pass, fan out agent proposals, gate every action
//          through policy, apply approvals, and audit each decision.
// Dependencies: crate::core, crate::interfaces, crate::runtime::{engine,
//               ledger, policy}, serde_json, tokio
// ============================================================================

//! ## Overview
//! One decision cycle per tick: the population agent establishes market
//! dynamics first, the remaining agents propose concurrently against the same
//! enriched snapshot, and the join collects proposals in a deterministic
//! order before gating. Agents never touch engine or ledger state; the
//! orchestrator owns the engine and serializes every commit. An agent that
//! misses its deadline contributes an empty proposal list and the cycle
//! proceeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::core::Action;
use crate::core::ActionId;
use crate::core::AgentRole;
use crate::core::CompanyState;
use crate::core::Constraints;
use crate::core::EntryType;
use crate::core::RunId;
use crate::core::SimTime;
use crate::interfaces::Agent;
use crate::interfaces::MarketDynamics;
use crate::runtime::context::InformationContext;
use crate::runtime::engine::ApplyOutcome;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::SimulationEngine;
use crate::runtime::engine::transition_audit_data;
use crate::runtime::ledger::AppendRequest;
use crate::runtime::ledger::AuditLedger;
use crate::runtime::ledger::LedgerError;
use crate::runtime::policy::PolicyDecision;
use crate::runtime::policy::PolicyEngine;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Final status of one gated action.
///
/// # Invariants
/// - Variants are stable for serialization and result reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Action was applied to the engine.
    Applied,
    /// Action was denied by permissions or policy.
    Denied,
    /// Action was escalated into the pending-approval queue.
    PendingApproval,
    /// Action was approved but its transition was rejected.
    Failed,
}

/// Per-action result of one decision cycle.
///
/// # Invariants
/// - `violated_rules` is non-empty only for policy denials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// The gated action, with its registered id.
    pub action: Action,
    /// Final status.
    pub status: ActionStatus,
    /// Human-readable rationale.
    pub reason: String,
    /// Violated policy rules, when denied by policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violated_rules: Vec<String>,
}

/// One queued escalation awaiting out-of-band approval.
///
/// # Invariants
/// - `action.id` is always present; approval is keyed by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// The escalated action.
    pub action: Action,
    /// Escalation rationale from the policy gate.
    pub reason: String,
    /// Simulation time the escalation was queued.
    pub queued_at: SimTime,
}

/// Summary of one registered agent.
///
/// # Invariants
/// - Mirrors the agent's static configuration, never its internal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent role.
    pub role: AgentRole,
    /// Permitted action types.
    pub permissions: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Orchestrator errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; ledger failures are
///   fatal for the affected run only.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Audit ledger rejected a write.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Engine failed while advancing or snapshotting.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Pending-approval queue lock was poisoned.
    #[error("pending-approval queue lock poisoned")]
    QueuePoisoned,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Default per-agent proposal deadline.
pub const DEFAULT_PROPOSAL_DEADLINE: Duration = Duration::from_secs(30);

/// Multi-agent decision-cycle coordinator for one run.
///
/// # Invariants
/// - The orchestrator owns the engine; agents receive snapshots only.
/// - Gating order equals result order equals audit order within a cycle.
pub struct AgentOrchestrator {
    /// Run identifier.
    run_id: RunId,
    /// Agents in registration order; the population agent runs first.
    agents: Vec<Arc<dyn Agent>>,
    /// Policy gate.
    policy: PolicyEngine,
    /// Owned engine, serialized by this lock.
    engine: Mutex<SimulationEngine>,
    /// Shared audit ledger.
    ledger: Arc<AuditLedger>,
    /// Pending-approval queue; external approvers read and resolve it.
    pending: StdMutex<Vec<PendingApproval>>,
    /// Per-agent proposal deadline.
    proposal_deadline: Duration,
    /// Counter minting proposal ids.
    minted: StdMutex<u64>,
}

impl std::fmt::Debug for AgentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOrchestrator")
            .field("run_id", &self.run_id)
            .field("agents", &self.agents.len())
            .finish_non_exhaustive()
    }
}

impl AgentOrchestrator {
    /// Creates an orchestrator owning the given engine.
    #[must_use]
    pub fn new(
        engine: SimulationEngine,
        agents: Vec<Arc<dyn Agent>>,
        policy: PolicyEngine,
        ledger: Arc<AuditLedger>,
    ) -> Self {
        let run_id = engine.run_id().clone();
        Self {
            run_id,
            agents,
            policy,
            engine: Mutex::new(engine),
            ledger,
            pending: StdMutex::new(Vec::new()),
            proposal_deadline: DEFAULT_PROPOSAL_DEADLINE,
            minted: StdMutex::new(0),
        }
    }

    /// Overrides the per-agent proposal deadline.
    #[must_use]
    pub const fn with_proposal_deadline(mut self, deadline: Duration) -> Self {
        self.proposal_deadline = deadline;
        self
    }

    /// Run identifier.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Shared audit ledger handle.
    #[must_use]
    pub fn ledger(&self) -> Arc<AuditLedger> {
        Arc::clone(&self.ledger)
    }

    /// Locks and returns the owned engine.
    pub async fn engine(&self) -> tokio::sync::MutexGuard<'_, SimulationEngine> {
        self.engine.lock().await
    }

    /// Static summaries of every registered agent.
    #[must_use]
    pub fn agent_summary(&self) -> Vec<AgentSummary> {
        self.agents
            .iter()
            .map(|agent| AgentSummary {
                role: agent.role(),
                permissions: agent.permissions(),
            })
            .collect()
    }

    /// Snapshot of the pending-approval queue.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::QueuePoisoned`] when the queue lock failed.
    pub fn pending_approvals(&self) -> Result<Vec<PendingApproval>, OrchestratorError> {
        let pending = self.pending.lock().map_err(|_| OrchestratorError::QueuePoisoned)?;
        Ok(pending.clone())
    }

    // ------------------------------------------------------------------
    // Decision cycle
    // ------------------------------------------------------------------

    /// Runs one decision cycle: population pass, concurrent agent pass,
    /// deterministic merge, policy gating, application, and auditing.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] on ledger or engine failure; per-action
    /// policy and transition failures are reported in the result list, never
    /// as errors.
    pub async fn run_decision_cycle(&self) -> Result<Vec<ActionResult>, OrchestratorError> {
        let mut engine = self.engine.lock().await;
        let base_context = engine.information_context()?;
        let state = engine.state().clone();
        let constraints = engine.blueprint().constraints.clone();
        let sim_time = engine.current_time();

        let mut all_actions: Vec<Action> = Vec::new();

        // Population pass: market dynamics first, so every other agent
        // conditions on the same market snapshot within the tick.
        let population = self.agents.iter().find(|agent| agent.role().is_population());
        let mut context = base_context;
        if let Some(agent) = population {
            if let Ok(Some(dynamics)) = agent.evaluate_market(&state, &context).await {
                self.record_market(&dynamics, sim_time)?;
                let value = serde_json::to_value(&dynamics).unwrap_or(json!({}));
                context = context.with_market_dynamics(value);
            }
            let influences = self
                .proposal_with_deadline(Arc::clone(agent), &context, &state, &constraints)
                .await;
            all_actions.extend(influences);
        }

        // Agent pass: concurrent fan-out over the enhanced context, joined in
        // registration order so the merge is deterministic.
        let mut handles: Vec<(AgentRole, JoinHandle<Vec<Action>>)> = Vec::new();
        for agent in &self.agents {
            if agent.role().is_population() {
                continue;
            }
            let task_agent = Arc::clone(agent);
            let task_context = context.clone();
            let task_state = state.clone();
            let task_constraints = constraints.clone();
            let deadline = self.proposal_deadline;
            let role = agent.role();
            let handle = tokio::spawn(async move {
                let proposal = timeout(
                    deadline,
                    task_agent.propose(&task_context, &task_state, &task_constraints),
                )
                .await;
                match proposal {
                    Ok(Ok(actions)) => actions,
                    // Timeout or agent failure: empty proposal list.
                    Ok(Err(_)) | Err(_) => Vec::new(),
                }
            });
            handles.push((role, handle));
        }
        for (role, handle) in handles {
            let actions = handle.await.unwrap_or_default();
            for mut action in actions {
                action.agent_role.get_or_insert(role.clone());
                all_actions.push(action);
            }
        }

        // Merge & gate in collection order.
        let mut results = Vec::with_capacity(all_actions.len());
        for action in all_actions {
            let result = self.gate_action(&mut engine, action)?;
            results.push(result);
        }
        Ok(results)
    }

    /// Runs one agent's proposal under the deadline, tagging each action with
    /// the agent's role.
    async fn proposal_with_deadline(
        &self,
        agent: Arc<dyn Agent>,
        context: &InformationContext,
        state: &CompanyState,
        constraints: &Constraints,
    ) -> Vec<Action> {
        let role = agent.role();
        let proposal =
            timeout(self.proposal_deadline, agent.propose(context, state, constraints)).await;
        match proposal {
            Ok(Ok(actions)) => actions
                .into_iter()
                .map(|mut action| {
                    action.agent_role.get_or_insert(role.clone());
                    action
                })
                .collect(),
            Ok(Err(_)) | Err(_) => Vec::new(),
        }
    }

    /// Gates one action: permissions, policy, application, audit.
    fn gate_action(
        &self,
        engine: &mut SimulationEngine,
        mut action: Action,
    ) -> Result<ActionResult, OrchestratorError> {
        let sim_time = engine.current_time();
        if action.id.is_none() {
            action.id = Some(self.mint_action_id()?);
        }
        self.audit_action(EntryType::ActionProposed, &action, sim_time, None)?;

        // Permission check precedes policy: an agent may only execute action
        // types in its permission set.
        let role = action.agent_role.clone();
        let permitted = role.as_ref().is_some_and(|role| {
            self.agents
                .iter()
                .find(|agent| &agent.role() == role)
                .is_some_and(|agent| agent.can_execute(&action.kind))
        });
        if !permitted {
            let reason = "insufficient permissions".to_string();
            self.audit_action(EntryType::ActionDenied, &action, sim_time, Some(&reason))?;
            return Ok(ActionResult {
                action,
                status: ActionStatus::Denied,
                reason,
                violated_rules: Vec::new(),
            });
        }

        let verdict = self.policy.evaluate_action(&action, engine.state(), role.as_ref());
        match verdict.decision {
            PolicyDecision::Deny => {
                self.audit_action(
                    EntryType::ActionDenied,
                    &action,
                    sim_time,
                    Some(&verdict.reason),
                )?;
                Ok(ActionResult {
                    action,
                    status: ActionStatus::Denied,
                    reason: verdict.reason,
                    violated_rules: verdict.violated_rules,
                })
            }
            PolicyDecision::Escalate => {
                self.audit_action(
                    EntryType::ActionEscalated,
                    &action,
                    sim_time,
                    Some(&verdict.reason),
                )?;
                let mut pending =
                    self.pending.lock().map_err(|_| OrchestratorError::QueuePoisoned)?;
                pending.push(PendingApproval {
                    action: action.clone(),
                    reason: verdict.reason.clone(),
                    queued_at: sim_time,
                });
                Ok(ActionResult {
                    action,
                    status: ActionStatus::PendingApproval,
                    reason: verdict.reason,
                    violated_rules: Vec::new(),
                })
            }
            PolicyDecision::Approve => {
                self.audit_action(
                    EntryType::ActionApproved,
                    &action,
                    sim_time,
                    Some(&verdict.reason),
                )?;
                self.apply_gated(engine, action, sim_time)
            }
        }
    }

    /// Applies an approved action and audits the outcome.
    fn apply_gated(
        &self,
        engine: &mut SimulationEngine,
        mut action: Action,
        sim_time: SimTime,
    ) -> Result<ActionResult, OrchestratorError> {
        let role = action.agent_role.clone();
        let outcome = engine.apply_action(&action, role.as_ref());
        action.id = Some(outcome.action_id().clone());
        match outcome {
            ApplyOutcome::Applied { .. } => {
                let data = engine
                    .transitions()
                    .last()
                    .map_or_else(|| json!({}), transition_audit_data);
                self.ledger.append(AppendRequest {
                    run_id: self.run_id.clone(),
                    wall_time: sim_time,
                    sim_time,
                    entry_type: EntryType::ActionApplied,
                    agent_role: role,
                    data,
                })?;
                Ok(ActionResult {
                    action,
                    status: ActionStatus::Applied,
                    reason: "action applied".to_string(),
                    violated_rules: Vec::new(),
                })
            }
            ApplyOutcome::AlreadyApplied { .. } => Ok(ActionResult {
                action,
                status: ActionStatus::Applied,
                reason: "action already applied".to_string(),
                violated_rules: Vec::new(),
            }),
            ApplyOutcome::Rejected { violations, .. } => {
                let reason = format!("transition rejected: {violations:?}");
                self.audit_action(EntryType::ActionFailed, &action, sim_time, Some(&reason))?;
                Ok(ActionResult {
                    action,
                    status: ActionStatus::Failed,
                    reason,
                    violated_rules: Vec::new(),
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Out-of-band approval
    // ------------------------------------------------------------------

    /// Approves a pending action by id, applying it to the engine.
    ///
    /// Returns `true` and removes the queue entry on success; `false` when
    /// the id is unknown or the transition is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] on ledger failure or a poisoned queue.
    pub async fn approve_action(
        &self,
        action_id: &ActionId,
        approved_by: &str,
    ) -> Result<bool, OrchestratorError> {
        let entry = {
            let pending = self.pending.lock().map_err(|_| OrchestratorError::QueuePoisoned)?;
            pending.iter().find(|entry| entry.action.id.as_ref() == Some(action_id)).cloned()
        };
        let Some(entry) = entry else {
            return Ok(false);
        };

        let mut engine = self.engine.lock().await;
        let sim_time = engine.current_time();
        let role = entry.action.agent_role.clone();
        let outcome = engine.apply_action(&entry.action, role.as_ref());
        if !outcome.is_applied() {
            return Ok(false);
        }

        self.ledger.append(AppendRequest {
            run_id: self.run_id.clone(),
            wall_time: sim_time,
            sim_time,
            entry_type: EntryType::ApprovalGranted,
            agent_role: role,
            data: json!({
                "id": format!("approval-{action_id}"),
                "action_id": action_id.as_str(),
                "approved_by": approved_by,
            }),
        })?;

        let mut pending = self.pending.lock().map_err(|_| OrchestratorError::QueuePoisoned)?;
        pending.retain(|queued| queued.action.id.as_ref() != Some(action_id));
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Tick driving
    // ------------------------------------------------------------------

    /// Advances the engine one tick and audits the advancement.
    ///
    /// Returns `false` once the timeline end is reached.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] on engine or ledger failure.
    pub async fn advance_tick(&self) -> Result<bool, OrchestratorError> {
        let mut engine = self.engine.lock().await;
        if !engine.tick()? {
            return Ok(false);
        }
        let sim_time = engine.current_time();
        let metrics = engine.metrics();
        self.ledger.append(AppendRequest {
            run_id: self.run_id.clone(),
            wall_time: sim_time,
            sim_time,
            entry_type: EntryType::TickAdvanced,
            agent_role: None,
            data: json!({
                "tick": engine.current_tick(),
                "cash": metrics.cash,
                "state_version": metrics.state_version,
            }),
        })?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Audit helpers
    // ------------------------------------------------------------------

    /// Mints a proposal id unique within this orchestrator.
    fn mint_action_id(&self) -> Result<ActionId, OrchestratorError> {
        let mut minted = self.minted.lock().map_err(|_| OrchestratorError::QueuePoisoned)?;
        *minted += 1;
        Ok(ActionId::new(format!("prop-{minted}")))
    }

    /// Appends a decision entry for an action.
    fn audit_action(
        &self,
        entry_type: EntryType,
        action: &Action,
        sim_time: SimTime,
        reason: Option<&str>,
    ) -> Result<(), OrchestratorError> {
        let suffix = audit_suffix(entry_type);
        let data = json!({
            "id": action.id.as_ref().map(|id| format!("{id}-{suffix}")),
            "action": action,
            "reason": reason,
        });
        self.ledger.append(AppendRequest {
            run_id: self.run_id.clone(),
            wall_time: sim_time,
            sim_time,
            entry_type,
            agent_role: action.agent_role.clone(),
            data,
        })?;
        Ok(())
    }

    /// Records market dynamics from the population pass.
    fn record_market(
        &self,
        dynamics: &MarketDynamics,
        sim_time: SimTime,
    ) -> Result<(), OrchestratorError> {
        self.ledger.append(AppendRequest {
            run_id: self.run_id.clone(),
            wall_time: sim_time,
            sim_time,
            entry_type: EntryType::MarketObserved,
            agent_role: Some(AgentRole::new(AgentRole::POPULATION)),
            data: serde_json::to_value(dynamics).unwrap_or(json!({})),
        })?;
        Ok(())
    }
}

/// Stable audit-id suffix for a decision entry type.
const fn audit_suffix(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::RunStarted => "started",
        EntryType::ActionProposed => "proposed",
        EntryType::ActionApproved => "approved",
        EntryType::ActionDenied => "denied",
        EntryType::ActionEscalated => "escalated",
        EntryType::ActionApplied => "applied",
        EntryType::ActionFailed => "failed",
        EntryType::ApprovalGranted => "granted",
        EntryType::MarketObserved => "market",
        EntryType::TickAdvanced => "tick",
    }
}
