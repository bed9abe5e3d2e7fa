// crates/venture-sim-core/src/runtime/engine.rs
// ============================================================================
// Module: Venture Sim Simulation Engine
// Description: Discrete-time tick loop with immutable state evolution.
// Purpose: Compose RNG, time-lock, events, and industry dynamics into a
//          deterministic engine with checkpoint/restore and an idempotent
//          action funnel.
// Dependencies: crate::core, crate::runtime::{context, keys, rng, timelock},
//               ed25519-dalek, serde, serde_json
// ============================================================================

//! ## Overview
//! A run's state transitions form a total order: the tick loop is strictly
//! sequential, actions commit whole or not at all, and every stochastic draw
//! comes from the run-seeded RNG. Checkpoints capture everything needed to
//! resume bit-identical execution and are integrity-checked on load;
//! corrupted input is rejected, never silently accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use ed25519_dalek::SigningKey;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::Action;
use crate::core::ActionId;
use crate::core::ActionKind;
use crate::core::AgentRole;
use crate::core::Blueprint;
use crate::core::CheckpointName;
use crate::core::CompanyState;
use crate::core::Event;
use crate::core::InputError;
use crate::core::RunId;
use crate::core::SimTime;
use crate::core::StateOverrides;
use crate::core::StateTransition;
use crate::core::Timeline;
use crate::core::TimelineEvent;
use crate::core::TransitionViolation;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::decode_hex;
use crate::core::hashing::encode_hex;
use crate::core::hashing::hash_canonical_json;
use crate::core::state::GROWTH_RATE_KEY;
use crate::interfaces::IndustryModel;
use crate::runtime::context::EventSummary;
use crate::runtime::context::InformationContext;
use crate::runtime::keys::RunKeys;
use crate::runtime::rng::SimRng;
use crate::runtime::timelock::TimeLock;
use crate::runtime::timelock::TimelockError;

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Default tick length in days (weekly ticks).
pub const DEFAULT_TICK_DAYS: u32 = 7;

/// How event parameter impacts behave when the event expires.
///
/// # Invariants
/// - The switch is explicit configuration; the engine never picks silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactExpiry {
    /// Impacts are permanent shocks; expiry applies no inverse.
    #[default]
    Permanent,
    /// Impacts are transient; expiry re-applies the recorded inverse.
    Transient,
}

/// Construction inputs for a simulation engine.
///
/// # Invariants
/// - `blueprint` and `timeline` are validated before the engine is built.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Company blueprint.
    pub blueprint: Blueprint,
    /// Event timeline bounding the run.
    pub timeline: Timeline,
    /// Run seed driving all stochastic choices and key derivation.
    pub seed: u64,
    /// Tick length in days.
    pub tick_days: u32,
    /// Run identifier.
    pub run_id: RunId,
    /// Event-impact expiry behavior.
    pub impact_expiry: ImpactExpiry,
}

impl EngineConfig {
    /// Creates a configuration with the default tick length and expiry mode.
    #[must_use]
    pub fn new(blueprint: Blueprint, timeline: Timeline, seed: u64, run_id: RunId) -> Self {
        Self {
            blueprint,
            timeline,
            seed,
            tick_days: DEFAULT_TICK_DAYS,
            run_id,
            impact_expiry: ImpactExpiry::default(),
        }
    }
}

// ============================================================================
// SECTION: Apply Outcomes
// ============================================================================

/// Outcome of funneling one action into the engine.
///
/// # Invariants
/// - `AlreadyApplied` is indistinguishable from success for callers retrying
///   with the same action id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// Transition validated and committed.
    Applied {
        /// Idempotency key of the committed action.
        action_id: ActionId,
    },
    /// Action id was already recorded; state unchanged.
    AlreadyApplied {
        /// Idempotency key of the earlier commit.
        action_id: ActionId,
    },
    /// Candidate transition violated a rule; state unchanged.
    Rejected {
        /// Idempotency key of the rejected action.
        action_id: ActionId,
        /// Every violated transition rule.
        violations: Vec<TransitionViolation>,
    },
}

impl ApplyOutcome {
    /// Returns `true` when the action is (or already was) committed.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::AlreadyApplied { .. })
    }

    /// Idempotency key of the action this outcome describes.
    #[must_use]
    pub const fn action_id(&self) -> &ActionId {
        match self {
            Self::Applied { action_id }
            | Self::AlreadyApplied { action_id }
            | Self::Rejected { action_id, .. } => action_id,
        }
    }
}

// ============================================================================
// SECTION: Metrics & Export
// ============================================================================

/// Flat metrics snapshot of a running engine.
///
/// # Invariants
/// - Values reflect the committed state only, never in-flight candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Current simulation time.
    pub current_time: SimTime,
    /// Cash on hand.
    pub cash: f64,
    /// Runway in months.
    pub runway_months: f64,
    /// Monthly revenue.
    pub revenue_monthly: f64,
    /// Monthly costs.
    pub costs_monthly: f64,
    /// Gross margin.
    pub margin: f64,
    /// Headcount.
    pub headcount: u64,
    /// Monthly growth rate.
    pub growth_rate: f64,
    /// Service level.
    pub service_level: f64,
    /// Compliance score.
    pub compliance_score: f64,
    /// Version of the reported state snapshot.
    pub state_version: u64,
}

/// Full exported view of a running engine.
///
/// # Invariants
/// - `state_hash` matches the canonical digest of `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedState {
    /// Current simulation time.
    pub current_time: SimTime,
    /// Committed state snapshot.
    pub state: CompanyState,
    /// Canonical digest of the snapshot.
    pub state_hash: HashDigest,
    /// Flat metrics view.
    pub metrics: Metrics,
}

// ============================================================================
// SECTION: Checkpoints
// ============================================================================

/// Checkpoint payload: everything needed to resume identical execution.
///
/// # Invariants
/// - `timelock_key` is the hex run key so sealed events stay decipherable
///   across restarts; it never appears in audit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Run identifier.
    pub run_id: RunId,
    /// Run seed.
    pub seed: u64,
    /// Tick length in days.
    pub tick_days: u32,
    /// Simulation time at capture.
    pub current_time: SimTime,
    /// Tick counter at capture.
    pub current_tick: u64,
    /// Committed state at capture.
    pub state: CompanyState,
    /// Serialized RNG state.
    pub rng: SimRng,
    /// Timeline cursor: count of activated events.
    pub event_cursor: usize,
    /// Active events with their recorded impact inverses.
    pub active_events: Vec<ActiveEvent>,
    /// Activation history summaries at capture.
    pub event_history: Vec<EventSummary>,
    /// Ids of every action applied before capture.
    pub applied_action_ids: Vec<ActionId>,
    /// Counter minting `act-<n>` ids.
    pub minted_actions: u64,
    /// Hex time-lock key.
    pub timelock_key: String,
}

/// Integrity-checked checkpoint blob.
///
/// # Invariants
/// - `digest` is the canonical digest of `payload`; decode fails closed on
///   any mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint payload.
    pub payload: CheckpointPayload,
    /// Canonical digest of the payload.
    pub digest: HashDigest,
}

impl Checkpoint {
    /// Wraps a payload with its integrity digest.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the payload cannot be canonicalized.
    pub fn seal(payload: CheckpointPayload) -> Result<Self, HashError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &payload)?;
        Ok(Self {
            payload,
            digest,
        })
    }

    /// Serializes the checkpoint to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointCorrupted`] when serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(self).map_err(|err| EngineError::CheckpointCorrupted {
            detail: err.to_string(),
        })
    }

    /// Deserializes and integrity-checks a checkpoint blob.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointCorrupted`] on malformed input or a
    /// digest mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let checkpoint: Self =
            serde_json::from_slice(bytes).map_err(|err| EngineError::CheckpointCorrupted {
                detail: err.to_string(),
            })?;
        checkpoint.verify()?;
        Ok(checkpoint)
    }

    /// Verifies the payload digest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointCorrupted`] on mismatch.
    pub fn verify(&self) -> Result<(), EngineError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &self.payload)?;
        if digest == self.digest {
            Ok(())
        } else {
            Err(EngineError::CheckpointCorrupted {
                detail: "payload digest mismatch".to_string(),
            })
        }
    }
}

// ============================================================================
// SECTION: Active Events
// ============================================================================

/// An activated event with the impact actually applied, for transient expiry.
///
/// # Invariants
/// - `applied_churn_delta` records the post-clamp delta so the inverse is
///   exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    /// The activated event.
    pub event: Event,
    /// Demand multiplier applied, when any.
    pub applied_demand_multiplier: Option<f64>,
    /// Cost multiplier applied, when any.
    pub applied_cost_multiplier: Option<f64>,
    /// Churn delta actually applied after clamping, when any.
    pub applied_churn_delta: Option<f64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Simulation engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling and exit-code mapping:
///   input errors are fail-fast, checkpoint corruption is an integrity
///   failure fatal to the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Blueprint or timeline failed validation.
    #[error(transparent)]
    Input(#[from] InputError),
    /// Time-lock sealing or verification failed.
    #[error(transparent)]
    Timelock(#[from] TimelockError),
    /// Canonical hashing failed.
    #[error(transparent)]
    Hashing(#[from] HashError),
    /// Checkpoint failed its integrity check.
    #[error("checkpoint corrupted: {detail}")]
    CheckpointCorrupted {
        /// Failure detail.
        detail: String,
    },
    /// Checkpoint belongs to a different run configuration.
    #[error("checkpoint mismatch: {detail}")]
    CheckpointMismatch {
        /// Failure detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Simulation Engine
// ============================================================================

/// Deterministic discrete-time simulation engine for one run.
///
/// # Invariants
/// - State transitions form a total order; no partial commits.
/// - All randomness flows through the run-seeded RNG.
/// - The engine never reads the host clock.
#[derive(Clone)]
pub struct SimulationEngine {
    /// Validated blueprint.
    blueprint: Blueprint,
    /// Run identifier.
    run_id: RunId,
    /// Run seed.
    seed: u64,
    /// Tick length in days.
    tick_days: u32,
    /// Event-impact expiry behavior.
    impact_expiry: ImpactExpiry,
    /// Run-scoped time-lock.
    timelock: TimeLock,
    /// Ledger signing key derived from the run inputs.
    signing_key: SigningKey,
    /// Normalized plaintext timeline events in timestamp order.
    timeline_events: Vec<Event>,
    /// Sealed wire form of the timeline as issued to agents.
    sealed_events: Vec<TimelineEvent>,
    /// End of the run.
    end_time: SimTime,
    /// Current simulation time.
    current_time: SimTime,
    /// Tick counter.
    current_tick: u64,
    /// Deterministic RNG.
    rng: SimRng,
    /// Committed state.
    state: CompanyState,
    /// Snapshot history, oldest first.
    state_history: Vec<CompanyState>,
    /// Committed action transitions in order.
    transitions: Vec<StateTransition>,
    /// Named in-engine checkpoints.
    checkpoints: BTreeMap<CheckpointName, Checkpoint>,
    /// Timeline cursor: count of activated events.
    event_cursor: usize,
    /// Currently active events.
    active_events: Vec<ActiveEvent>,
    /// Activation history summaries, oldest first.
    event_history: Vec<EventSummary>,
    /// Optional industry model.
    industry: Option<Arc<dyn IndustryModel>>,
    /// Counter minting `act-<n>` ids.
    minted_actions: u64,
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("run_id", &self.run_id)
            .field("current_time", &self.current_time)
            .field("current_tick", &self.current_tick)
            .field("state_version", &self.state.version)
            .finish_non_exhaustive()
    }
}

impl SimulationEngine {
    /// Builds an engine: validates inputs, derives run keys, seals future
    /// events, and derives the initial state from the blueprint.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Input`] on invalid blueprint or timeline and
    /// [`EngineError::Timelock`] when sealing fails.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.blueprint.validate()?;
        let timeline = config.timeline.normalized()?;
        let keys = RunKeys::derive(config.seed, &config.run_id);
        let timelock = TimeLock::new(keys.timelock_key);
        let sealed_events = timelock.seal_future_events(&timeline.events, timeline.start_date)?;
        let state = initial_state(&config.blueprint, timeline.start_date);

        Ok(Self {
            blueprint: config.blueprint,
            run_id: config.run_id,
            seed: config.seed,
            tick_days: config.tick_days,
            impact_expiry: config.impact_expiry,
            timelock,
            signing_key: keys.signing_key,
            timeline_events: timeline.events,
            sealed_events,
            end_time: timeline.end_date,
            current_time: timeline.start_date,
            current_tick: 0,
            rng: SimRng::from_seed(config.seed),
            state_history: vec![state.clone()],
            state,
            transitions: Vec::new(),
            checkpoints: BTreeMap::new(),
            event_cursor: 0,
            active_events: Vec::new(),
            event_history: Vec::new(),
            industry: None,
            minted_actions: 0,
        })
    }

    /// Builds an engine resumed from an exported checkpoint.
    ///
    /// The checkpoint is integrity-checked and must match the configuration's
    /// run id and seed; the time-lock key comes from the checkpoint so sealed
    /// events stay decipherable.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointCorrupted`] on integrity failure and
    /// [`EngineError::CheckpointMismatch`] when the checkpoint belongs to a
    /// different run.
    pub fn resume(config: EngineConfig, checkpoint: &Checkpoint) -> Result<Self, EngineError> {
        checkpoint.verify()?;
        let payload = &checkpoint.payload;
        if payload.run_id != config.run_id || payload.seed != config.seed {
            return Err(EngineError::CheckpointMismatch {
                detail: format!(
                    "checkpoint is for run {} seed {}",
                    payload.run_id, payload.seed
                ),
            });
        }
        let key_bytes = decode_hex(&payload.timelock_key)?;
        let key: [u8; 32] =
            key_bytes.as_slice().try_into().map_err(|_| EngineError::CheckpointCorrupted {
                detail: "time-lock key must be 32 bytes".to_string(),
            })?;

        let mut engine = Self::new(config)?;
        let keys = RunKeys::with_timelock_key(engine.seed, &engine.run_id, key);
        engine.timelock = TimeLock::new(keys.timelock_key);
        engine.signing_key = keys.signing_key;
        engine.sealed_events = engine
            .timelock
            .seal_future_events(&engine.timeline_events, payload.current_time)?;
        engine.current_time = payload.current_time;
        engine.current_tick = payload.current_tick;
        engine.rng = payload.rng.clone();
        engine.state = payload.state.clone();
        engine.state_history = vec![payload.state.clone()];
        engine.event_cursor = payload.event_cursor;
        engine.active_events = payload.active_events.clone();
        engine.event_history = payload.event_history.clone();
        engine.minted_actions = payload.minted_actions;
        engine.transitions = payload
            .applied_action_ids
            .iter()
            .map(|id| replayed_transition(&payload.state, id))
            .collect();
        Ok(engine)
    }

    /// Attaches the pluggable industry model.
    #[must_use]
    pub fn with_industry_model(mut self, model: Arc<dyn IndustryModel>) -> Self {
        self.industry = Some(model);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Run identifier.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Committed state snapshot.
    #[must_use]
    pub const fn state(&self) -> &CompanyState {
        &self.state
    }

    /// Current simulation time.
    #[must_use]
    pub const fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Tick counter.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Blueprint the engine was built from.
    #[must_use]
    pub const fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Committed action transitions in order.
    #[must_use]
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Ledger signing key for this run.
    #[must_use]
    pub const fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    // ------------------------------------------------------------------
    // Information context
    // ------------------------------------------------------------------

    /// Builds the time-locked information context for the current tick.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Timelock`] when signal release fails or the
    /// future-blindness check trips.
    pub fn information_context(&self) -> Result<InformationContext, EngineError> {
        // Plaintext events may still carry unreleased signals; strip them so
        // the context never leaks a future release.
        let observable_events: Vec<Event> = self
            .timelock
            .accessible_events(&self.sealed_events, self.current_time)
            .into_iter()
            .map(|mut event| {
                event.signals.retain(|signal| signal.release_time <= self.current_time);
                event
            })
            .collect();
        let released =
            self.timelock.released_signals_by_event(&self.sealed_events, self.current_time)?;
        let recent_start = self.event_history.len().saturating_sub(5);
        let context = InformationContext {
            current_time: self.current_time,
            current_tick: self.current_tick,
            observable_events,
            observable_signals_by_event: released.into_iter().collect(),
            active_events: self.active_events.iter().map(|a| EventSummary::from(&a.event)).collect(),
            recent_events: self.event_history[recent_start..].to_vec(),
            market_dynamics: None,
        };
        context.verify_future_blind()?;
        Ok(context)
    }

    // ------------------------------------------------------------------
    // Action funnel
    // ------------------------------------------------------------------

    /// Funnels one action into the engine, idempotently by action id.
    ///
    /// Mints an id when the proposal carries none. Whole actions commit or
    /// nothing does.
    pub fn apply_action(
        &mut self,
        action: &Action,
        agent_role: Option<&AgentRole>,
    ) -> ApplyOutcome {
        let action_id = match &action.id {
            Some(id) => id.clone(),
            None => {
                self.minted_actions += 1;
                ActionId::new(format!("act-{}", self.minted_actions))
            }
        };

        if self
            .transitions
            .iter()
            .any(|transition| transition.action.id.as_ref() == Some(&action_id))
        {
            return ApplyOutcome::AlreadyApplied {
                action_id,
            };
        }

        let mut registered = action.clone();
        registered.id = Some(action_id.clone());

        let candidate = self.candidate_state(&registered);
        let transition = StateTransition {
            before: self.state.clone(),
            after: candidate,
            action: registered.clone(),
            agent_role: agent_role.cloned(),
            reason: registered.reason_or_default().to_string(),
            committed_at: self.current_time,
        };
        let violations = transition.violations();
        if !violations.is_empty() {
            return ApplyOutcome::Rejected {
                action_id,
                violations,
            };
        }

        self.state = transition.after.clone();
        self.state_history.push(transition.after.clone());
        self.transitions.push(transition);
        ApplyOutcome::Applied {
            action_id,
        }
    }

    /// Computes the candidate next state for an action.
    fn candidate_state(&self, action: &Action) -> CompanyState {
        let mut overrides = StateOverrides {
            timestamp: Some(self.current_time),
            ..StateOverrides::default()
        };
        match &action.kind {
            ActionKind::AdjustHiring { delta, cost_per_head } => {
                let current = i64::try_from(self.state.headcount).unwrap_or(i64::MAX);
                let next = (current + delta).max(0);
                overrides.headcount = Some(next.unsigned_abs());
                overrides.costs_monthly = Some(
                    (*delta as f64).mul_add(*cost_per_head, self.state.costs_monthly),
                );
            }
            ActionKind::ChangePricing { pricing } => {
                let mut next = self.state.pricing.clone();
                for (product, price) in pricing {
                    next.insert(product.clone(), *price);
                }
                overrides.pricing = Some(next);
            }
            ActionKind::AllocateBudget { allocation } => {
                let total: f64 = allocation.values().sum();
                if total <= self.state.cash {
                    overrides.cash = Some(self.state.cash - total);
                }
            }
            ActionKind::ModifyInventoryPolicy { inventory } => {
                let mut next = self.state.inventory.clone();
                for (product, quantity) in inventory {
                    next.insert(product.clone(), *quantity);
                }
                overrides.inventory = Some(next);
            }
            ActionKind::TriggerCostCutting { reduction_percent } => {
                overrides.costs_monthly =
                    Some(self.state.costs_monthly * (1.0 - reduction_percent));
            }
        }
        self.state.clone_with(overrides)
    }

    // ------------------------------------------------------------------
    // Tick loop
    // ------------------------------------------------------------------

    /// Advances the run by one tick.
    ///
    /// Returns `Ok(false)` once the timeline end is reached. Each tick:
    /// advance time, unseal newly-reached events, expire old ones, activate
    /// new ones and apply their impacts, run the industry model, then the
    /// cash-flow step.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Timelock`] when a newly-reached sealed event
    /// fails to unseal (tampered ciphertext).
    pub fn tick(&mut self) -> Result<bool, EngineError> {
        if self.current_time >= self.end_time {
            return Ok(false);
        }

        self.current_tick += 1;
        self.current_time = self.current_time.plus_days(i64::from(self.tick_days));
        self.unseal_reached_events()?;

        self.expire_events();
        self.activate_events();
        self.run_industry_model();
        self.cash_flow_step();

        Ok(true)
    }

    /// Replaces sealed entries whose time has come with their authenticated
    /// plaintext. Tampered ciphertext is detected here, at unlock.
    fn unseal_reached_events(&mut self) -> Result<(), EngineError> {
        let now = self.current_time;
        for entry in &mut self.sealed_events {
            if let TimelineEvent::Sealed { timestamp, nonce, ciphertext, .. } = entry
                && *timestamp <= now
            {
                let event = self.timelock.unseal_event(nonce, ciphertext)?;
                *entry = TimelineEvent::Plain {
                    event,
                };
            }
        }
        Ok(())
    }

    /// Drops active events past their duration, inverting impacts when the
    /// expiry mode is transient.
    fn expire_events(&mut self) {
        let now = self.current_time;
        let (expired, remaining): (Vec<ActiveEvent>, Vec<ActiveEvent>) =
            self.active_events.drain(..).partition(|active| active.event.expires_at() < now);
        self.active_events = remaining;
        if self.impact_expiry == ImpactExpiry::Permanent {
            return;
        }
        for active in expired {
            self.invert_impacts(&active);
        }
    }

    /// Re-applies the recorded inverse of one expired event's impacts.
    fn invert_impacts(&mut self, active: &ActiveEvent) {
        let mut overrides = StateOverrides {
            timestamp: Some(self.current_time),
            ..StateOverrides::default()
        };
        let mut dirty = false;
        if let Some(multiplier) = active.applied_demand_multiplier
            && multiplier != 0.0
        {
            let demand = self
                .state
                .demand
                .iter()
                .map(|(product, value)| (product.clone(), value / multiplier))
                .collect();
            overrides.demand = Some(demand);
            dirty = true;
        }
        if let Some(multiplier) = active.applied_cost_multiplier
            && multiplier != 0.0
        {
            overrides.costs_monthly = Some(self.state.costs_monthly / multiplier);
            dirty = true;
        }
        if let Some(delta) = active.applied_churn_delta {
            overrides.churn_rate = Some((self.state.churn_rate - delta).clamp(0.0, 1.0));
            dirty = true;
        }
        if dirty {
            self.state = self.state.clone_with(overrides);
            self.state_history.push(self.state.clone());
        }
    }

    /// Activates every timeline event newly reached by the cursor and applies
    /// its parameter impacts.
    fn activate_events(&mut self) {
        while self.event_cursor < self.timeline_events.len() {
            let event = self.timeline_events[self.event_cursor].clone();
            if event.timestamp > self.current_time {
                break;
            }
            self.event_cursor += 1;
            let active = self.apply_event_impacts(event);
            self.event_history.push(EventSummary::from(&active.event));
            self.active_events.push(active);
        }
    }

    /// Applies one event's recognized impacts; unknown levers are ignored.
    fn apply_event_impacts(&mut self, event: Event) -> ActiveEvent {
        let impacts = event.parameter_impacts.clone();
        let mut overrides = StateOverrides {
            timestamp: Some(self.current_time),
            ..StateOverrides::default()
        };
        let mut applied_churn_delta = None;
        let mut dirty = false;

        if let Some(multiplier) = impacts.demand_multiplier {
            let demand = self
                .state
                .demand
                .iter()
                .map(|(product, value)| (product.clone(), value * multiplier))
                .collect();
            overrides.demand = Some(demand);
            dirty = true;
        }
        if let Some(multiplier) = impacts.cost_multiplier {
            overrides.costs_monthly = Some(self.state.costs_monthly * multiplier);
            dirty = true;
        }
        if let Some(delta) = impacts.churn_delta {
            let next = (self.state.churn_rate + delta).clamp(0.0, 1.0);
            applied_churn_delta = Some(next - self.state.churn_rate);
            overrides.churn_rate = Some(next);
            dirty = true;
        }

        if dirty {
            self.state = self.state.clone_with(overrides);
            self.state_history.push(self.state.clone());
        }

        ActiveEvent {
            event,
            applied_demand_multiplier: impacts.demand_multiplier,
            applied_cost_multiplier: impacts.cost_multiplier,
            applied_churn_delta,
        }
    }

    /// Runs the pluggable industry model for this tick, if any.
    ///
    /// Model failures are treated as invalid transitions: the prior state is
    /// kept and the tick continues.
    fn run_industry_model(&mut self) {
        let Some(model) = self.industry.clone() else {
            return;
        };
        let params = self.blueprint.industry_params.clone();
        match model.update_state(&self.state, self.tick_days, &params, &mut self.rng) {
            Ok(mut overrides) => {
                overrides.timestamp = Some(self.current_time);
                self.state = self.state.clone_with(overrides);
                self.state_history.push(self.state.clone());
            }
            Err(_) => {
                // Converted to a no-op transition; the run continues.
            }
        }
    }

    /// Fixed cash-flow step: prorated revenue minus prorated costs.
    fn cash_flow_step(&mut self) {
        let days_fraction = f64::from(self.tick_days) / crate::core::time::DAYS_PER_MONTH;
        let revenue = self.state.revenue_monthly * days_fraction;
        let costs = self.state.costs_monthly * days_fraction;
        let overrides = StateOverrides {
            timestamp: Some(self.current_time),
            cash: Some(self.state.cash + revenue - costs),
            ..StateOverrides::default()
        };
        self.state = self.state.clone_with(overrides);
        self.state_history.push(self.state.clone());
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Captures the current engine state as an integrity-sealed checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Hashing`] when the payload cannot be sealed.
    pub fn checkpoint(&self) -> Result<Checkpoint, EngineError> {
        let payload = CheckpointPayload {
            run_id: self.run_id.clone(),
            seed: self.seed,
            tick_days: self.tick_days,
            current_time: self.current_time,
            current_tick: self.current_tick,
            state: self.state.clone(),
            rng: self.rng.clone(),
            event_cursor: self.event_cursor,
            active_events: self.active_events.clone(),
            event_history: self.event_history.clone(),
            applied_action_ids: self
                .transitions
                .iter()
                .filter_map(|transition| transition.action.id.clone())
                .collect(),
            minted_actions: self.minted_actions,
            timelock_key: encode_hex(&self.timelock.key()),
        };
        Ok(Checkpoint::seal(payload)?)
    }

    /// Captures a named in-engine checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Hashing`] when the payload cannot be sealed.
    pub fn create_checkpoint(&mut self, name: impl Into<CheckpointName>) -> Result<(), EngineError> {
        let checkpoint = self.checkpoint()?;
        self.checkpoints.insert(name.into(), checkpoint);
        Ok(())
    }

    /// Restores a named checkpoint, truncating history strictly newer than
    /// the checkpoint. Returns `false` when the name is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointCorrupted`] when the stored blob
    /// fails its integrity check.
    pub fn restore_checkpoint(
        &mut self,
        name: &CheckpointName,
    ) -> Result<bool, EngineError> {
        let Some(checkpoint) = self.checkpoints.get(name).cloned() else {
            return Ok(false);
        };
        checkpoint.verify()?;
        let payload = checkpoint.payload;
        let version = payload.state.version;
        // Time moves backwards here: events unsealed since the capture must
        // go dark again.
        self.sealed_events =
            self.timelock.seal_future_events(&self.timeline_events, payload.current_time)?;
        self.current_time = payload.current_time;
        self.current_tick = payload.current_tick;
        self.rng = payload.rng;
        self.event_cursor = payload.event_cursor;
        self.active_events = payload.active_events;
        self.event_history = payload.event_history;
        self.minted_actions = payload.minted_actions;
        self.state = payload.state;
        self.state_history.retain(|snapshot| snapshot.version <= version);
        self.transitions.retain(|transition| transition.after.version <= version);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Flat metrics view of the committed state.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        Metrics {
            current_time: self.current_time,
            cash: self.state.cash,
            runway_months: self.state.runway_months(),
            revenue_monthly: self.state.revenue_monthly,
            costs_monthly: self.state.costs_monthly,
            margin: self.state.margin,
            headcount: self.state.headcount,
            growth_rate: self.state.growth_rate(),
            service_level: self.state.service_level,
            compliance_score: self.state.compliance_score,
            state_version: self.state.version,
        }
    }

    /// Full exported view of the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Hashing`] when the state cannot be hashed.
    pub fn export_state(&self) -> Result<ExportedState, EngineError> {
        Ok(ExportedState {
            current_time: self.current_time,
            state: self.state.clone(),
            state_hash: self.state.hash()?,
            metrics: self.metrics(),
        })
    }

    /// Value-level copy for counterfactual rollouts; shares no mutable state
    /// with this engine.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Derives the initial company state from blueprint initial conditions.
fn initial_state(blueprint: &Blueprint, start: SimTime) -> CompanyState {
    let ic = &blueprint.initial_conditions;
    let mut metadata = BTreeMap::new();
    metadata.insert(GROWTH_RATE_KEY.to_string(), json!(0.0));
    CompanyState {
        timestamp: start,
        version: 0,
        cash: ic.cash,
        revenue_monthly: 0.0,
        costs_monthly: ic.monthly_burn,
        margin: ic.margins.get("gross").copied().unwrap_or(0.0),
        headcount: ic.headcount,
        capacity: ic.capacity.clone(),
        utilization: BTreeMap::new(),
        demand: BTreeMap::new(),
        pricing: ic.pricing.clone(),
        cac: BTreeMap::new(),
        churn_rate: 0.0,
        inventory: BTreeMap::new(),
        backlog: BTreeMap::new(),
        lead_times: BTreeMap::new(),
        service_level: 1.0,
        risk_flags: BTreeMap::new(),
        compliance_score: 1.0,
        metadata,
    }
}

/// Placeholder transition recording an action id replayed from a checkpoint.
///
/// Only the id participates in idempotency checks; before/after snapshots are
/// the checkpoint state.
fn replayed_transition(state: &CompanyState, id: &ActionId) -> StateTransition {
    StateTransition {
        before: state.clone(),
        after: state.clone(),
        action: Action::new(ActionKind::AllocateBudget {
            allocation: BTreeMap::new(),
        })
        .with_id(id.clone()),
        agent_role: None,
        reason: "replayed from checkpoint".to_string(),
        committed_at: state.timestamp,
    }
}

/// Audit payload describing a committed transition, for ledger consumers.
#[must_use]
pub fn transition_audit_data(transition: &StateTransition) -> Value {
    let before_hash = transition.before.hash().map(|digest| digest.value).unwrap_or_default();
    let after_hash = transition.after.hash().map(|digest| digest.value).unwrap_or_default();
    json!({
        "id": transition.action.id.as_ref().map(ActionId::as_str),
        "action": transition.action,
        "before_hash": before_hash,
        "after_hash": after_hash,
        "reason": transition.reason,
    })
}
