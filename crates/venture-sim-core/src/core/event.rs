// crates/venture-sim-core/src/core/event.rs
// ============================================================================
// Module: Venture Sim World Events
// Description: World events, staged signals, and their sealed wire form.
// Purpose: Model the timeline inputs that the time-lock filters per tick.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Events carry parameter impacts the engine applies on activation and an
//! ordered list of staged signals that leak out ahead of the event itself.
//! Future events travel as [`TimelineEvent::Sealed`] ciphertext so that their
//! existence and timing are public while their content is not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EventId;
use crate::core::time::SimTime;

// ============================================================================
// SECTION: Signals
// ============================================================================

/// Staged signal released ahead of (or together with) its parent event.
///
/// # Invariants
/// - `release_time` gates visibility; content is opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Time at which the signal becomes observable.
    pub release_time: SimTime,
    /// Signal kind label (`rumor`, `confirmed`, ...).
    #[serde(rename = "type")]
    pub signal_type: String,
    /// Free-form signal content.
    pub content: String,
}

// ============================================================================
// SECTION: Parameter Impacts
// ============================================================================

/// Named levers applied to company state when an event activates.
///
/// # Invariants
/// - Unknown levers round-trip through `extra` and are ignored by the engine
///   (forward-compatible).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterImpacts {
    /// Multiplier applied to every demand entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_multiplier: Option<f64>,
    /// Multiplier applied to monthly costs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_multiplier: Option<f64>,
    /// Additive churn delta, clamped into `[0, 1]` on application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_delta: Option<f64>,
    /// Unrecognized levers, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ParameterImpacts {
    /// Returns `true` when no recognized lever is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.demand_multiplier.is_none()
            && self.cost_multiplier.is_none()
            && self.churn_delta.is_none()
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// World event scheduled on the run timeline.
///
/// # Invariants
/// - `severity` lies in `[0, 1]` and `duration_days > 0` after validation.
/// - `id` is present after timeline normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier; minted during timeline normalization when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    /// Time at which the event occurs.
    pub timestamp: SimTime,
    /// Event kind label (`competitor_launch`, `supply_shock`, ...).
    pub event_type: String,
    /// Severity in `[0, 1]`.
    pub severity: f64,
    /// Days the event remains active.
    pub duration_days: u32,
    /// Tags of affected business areas.
    #[serde(default)]
    pub affected_areas: BTreeSet<String>,
    /// Staged signals in release order.
    #[serde(default)]
    pub signals: Vec<Signal>,
    /// Parameter impacts applied on activation.
    #[serde(default)]
    pub parameter_impacts: ParameterImpacts,
}

impl Event {
    /// Time at which the event stops being active.
    #[must_use]
    pub fn expires_at(&self) -> SimTime {
        self.timestamp.plus_days(i64::from(self.duration_days))
    }
}

// ============================================================================
// SECTION: Timeline Wire Form
// ============================================================================

/// Timeline entry as handed to agents: plaintext past, sealed future.
///
/// # Invariants
/// - `Sealed` exposes only the event id, its timestamp, and ciphertext; the
///   payload is recoverable only under the run's time-lock key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEvent {
    /// Past or present event, observable verbatim.
    Plain {
        /// The plaintext event.
        #[serde(flatten)]
        event: Event,
    },
    /// Future event, content sealed under the run key.
    Sealed {
        /// Event identifier (public).
        event_id: EventId,
        /// Event timestamp (public).
        timestamp: SimTime,
        /// Base64 AEAD nonce.
        nonce: String,
        /// Base64 ciphertext of the canonical event payload.
        ciphertext: String,
    },
}

impl TimelineEvent {
    /// Public timestamp of the entry, sealed or not.
    #[must_use]
    pub const fn timestamp(&self) -> SimTime {
        match self {
            Self::Plain { event } => event.timestamp,
            Self::Sealed { timestamp, .. } => *timestamp,
        }
    }

    /// Public event identifier of the entry.
    ///
    /// Returns `None` only for plaintext events that skipped normalization.
    #[must_use]
    pub const fn event_id(&self) -> Option<&EventId> {
        match self {
            Self::Plain { event } => event.id.as_ref(),
            Self::Sealed { event_id, .. } => Some(event_id),
        }
    }

    /// Returns `true` when the entry is sealed ciphertext.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed { .. })
    }
}
