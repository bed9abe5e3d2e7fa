// crates/venture-sim-core/src/runtime/context.rs
// ============================================================================
// Module: Venture Sim Information Context
// Description: Time-locked world view handed to decision agents.
// Purpose: Snapshot observable events and released signals for one wall-time,
//          verified future-blind at construction.
// Dependencies: crate::core, crate::runtime::timelock, serde
// ============================================================================

//! ## Overview
//! An [`InformationContext`] is built by the engine for the current tick and
//! is the only world view agents receive. It never carries an event with
//! `timestamp > current_time` or a signal with `release_time > current_time`;
//! construction re-verifies this with the time-lock's recursive check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::Event;
use crate::core::EventId;
use crate::core::Signal;
use crate::core::SimTime;
use crate::runtime::timelock::TimeLock;
use crate::runtime::timelock::TimelockError;

// ============================================================================
// SECTION: Event Summaries
// ============================================================================

/// Summary of an active or recently expired event.
///
/// # Invariants
/// - Summaries describe only events already observable at context time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event identifier.
    pub event_id: EventId,
    /// Event timestamp.
    pub timestamp: SimTime,
    /// Event kind label.
    pub event_type: String,
    /// Severity in `[0, 1]`.
    pub severity: f64,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id.clone().unwrap_or_else(|| EventId::new("evt-unidentified")),
            timestamp: event.timestamp,
            event_type: event.event_type.clone(),
            severity: event.severity,
        }
    }
}

// ============================================================================
// SECTION: Information Context
// ============================================================================

/// Time-locked world view for one decision cycle.
///
/// # Invariants
/// - No contained timestamp exceeds `current_time`; construction fails closed
///   when the recursive future-access check trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationContext {
    /// Wall-time the view was issued for.
    pub current_time: SimTime,
    /// Tick counter at issue time.
    pub current_tick: u64,
    /// Events observable at `current_time` (plaintext, past or present).
    pub observable_events: Vec<Event>,
    /// Released signals grouped by parent event id; parents may still be
    /// sealed.
    pub observable_signals_by_event: BTreeMap<EventId, Vec<Signal>>,
    /// Currently active events.
    pub active_events: Vec<EventSummary>,
    /// Most recently activated events, newest last.
    pub recent_events: Vec<EventSummary>,
    /// Market dynamics recorded by the population pass, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_dynamics: Option<Value>,
}

impl InformationContext {
    /// Verifies the context leaks nothing from the future.
    ///
    /// # Errors
    ///
    /// Returns [`TimelockError::FutureLeak`] naming the offending path, or a
    /// serialization error when the context cannot be inspected.
    pub fn verify_future_blind(&self) -> Result<(), TimelockError> {
        let value = serde_json::to_value(self)
            .map_err(|err| TimelockError::Serialization(err.to_string()))?;
        TimeLock::verify_no_future_access(&value, self.current_time)
    }

    /// Released signals for one parent event.
    #[must_use]
    pub fn signals_for(&self, event_id: &EventId) -> &[Signal] {
        self.observable_signals_by_event.get(event_id).map_or(&[], Vec::as_slice)
    }

    /// Returns a copy of this context enriched with market dynamics.
    #[must_use]
    pub fn with_market_dynamics(mut self, dynamics: Value) -> Self {
        self.market_dynamics = Some(dynamics);
        self
    }
}
