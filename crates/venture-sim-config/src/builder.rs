// crates/venture-sim-config/src/builder.rs
// ============================================================================
// Module: Event Builder
// Description: Validating builder for custom timeline events.
// Purpose: Author events field by field, rejecting out-of-range values at the
//          point they are set.
// Dependencies: venture-sim-core, thiserror
// ============================================================================

//! ## Overview
//! The builder front-loads the validation the engine would apply later:
//! severity outside `[0, 1]`, non-positive durations, and missing required
//! fields fail at authoring time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;
use venture_sim_core::Event;
use venture_sim_core::EventId;
use venture_sim_core::ParameterImpacts;
use venture_sim_core::Signal;
use venture_sim_core::SimTime;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Event authoring errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuilderError {
    /// Severity lies outside `[0, 1]`.
    #[error("severity must be between 0 and 1, got {severity}")]
    SeverityOutOfRange {
        /// Rejected severity.
        severity: f64,
    },
    /// Duration is not positive.
    #[error("duration must be positive")]
    DurationNotPositive,
    /// A required field was never set.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Event Builder
// ============================================================================

/// Validating builder for custom events.
///
/// # Invariants
/// - `build` succeeds only when timestamp, type, severity, and duration are
///   all set and valid.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    /// Optional explicit event id.
    id: Option<EventId>,
    /// Event timestamp.
    timestamp: Option<SimTime>,
    /// Event kind label.
    event_type: Option<String>,
    /// Severity in `[0, 1]`.
    severity: Option<f64>,
    /// Active duration in days.
    duration_days: Option<u32>,
    /// Affected area tags.
    affected_areas: BTreeSet<String>,
    /// Staged signals.
    signals: Vec<Signal>,
    /// Parameter impacts.
    impacts: ParameterImpacts,
}

impl EventBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit event id.
    #[must_use]
    pub fn id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the event timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: SimTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the event kind label.
    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the severity, rejecting values outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::SeverityOutOfRange`] on invalid input.
    pub fn severity(mut self, severity: f64) -> Result<Self, BuilderError> {
        if !(0.0..=1.0).contains(&severity) {
            return Err(BuilderError::SeverityOutOfRange {
                severity,
            });
        }
        self.severity = Some(severity);
        Ok(self)
    }

    /// Sets the active duration, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::DurationNotPositive`] on zero days.
    pub fn duration_days(mut self, days: u32) -> Result<Self, BuilderError> {
        if days == 0 {
            return Err(BuilderError::DurationNotPositive);
        }
        self.duration_days = Some(days);
        Ok(self)
    }

    /// Adds an affected-area tag.
    #[must_use]
    pub fn affected_area(mut self, area: impl Into<String>) -> Self {
        self.affected_areas.insert(area.into());
        self
    }

    /// Adds a staged signal.
    #[must_use]
    pub fn signal(
        mut self,
        release_time: SimTime,
        signal_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.signals.push(Signal {
            release_time,
            signal_type: signal_type.into(),
            content: content.into(),
        });
        self
    }

    /// Sets the demand multiplier lever.
    #[must_use]
    pub const fn demand_multiplier(mut self, multiplier: f64) -> Self {
        self.impacts.demand_multiplier = Some(multiplier);
        self
    }

    /// Sets the cost multiplier lever.
    #[must_use]
    pub const fn cost_multiplier(mut self, multiplier: f64) -> Self {
        self.impacts.cost_multiplier = Some(multiplier);
        self
    }

    /// Sets the churn delta lever.
    #[must_use]
    pub const fn churn_delta(mut self, delta: f64) -> Self {
        self.impacts.churn_delta = Some(delta);
        self
    }

    /// Builds the event, failing when a required field was never set.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::MissingField`] naming the first absent field.
    pub fn build(self) -> Result<Event, BuilderError> {
        let timestamp = self.timestamp.ok_or(BuilderError::MissingField {
            field: "timestamp",
        })?;
        let event_type = self.event_type.ok_or(BuilderError::MissingField {
            field: "event_type",
        })?;
        let severity = self.severity.ok_or(BuilderError::MissingField {
            field: "severity",
        })?;
        let duration_days = self.duration_days.ok_or(BuilderError::MissingField {
            field: "duration_days",
        })?;
        Ok(Event {
            id: self.id,
            timestamp,
            event_type,
            severity,
            duration_days,
            affected_areas: self.affected_areas,
            signals: self.signals,
            parameter_impacts: self.impacts,
        })
    }
}
