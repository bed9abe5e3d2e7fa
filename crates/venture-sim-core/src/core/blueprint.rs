// crates/venture-sim-core/src/core/blueprint.rs
// ============================================================================
// Module: Venture Sim Blueprint & Timeline
// Description: Run configuration inputs with fail-fast validation.
// Purpose: Define the company blueprint, policy set, and event timeline consumed
//          by the engine, rejecting invalid input at construction.
// Dependencies: crate::core::{event, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! The blueprint describes the company being simulated; the timeline describes
//! the world it runs through. Both are validated before an engine is built;
//! invalid input never reaches the tick loop. Timeline normalization sorts
//! events by timestamp and mints missing event ids deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::event::Event;
use crate::core::identifiers::EventId;
use crate::core::identifiers::ProductId;
use crate::core::time::SimTime;

// ============================================================================
// SECTION: Blueprint
// ============================================================================

/// Initial company conditions taken from the blueprint.
///
/// # Invariants
/// - `cash` and `monthly_burn` are non-negative after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    /// Opening cash balance.
    pub cash: f64,
    /// Opening monthly burn (initial `costs_monthly`).
    pub monthly_burn: f64,
    /// Opening list prices per product.
    #[serde(default)]
    pub pricing: BTreeMap<ProductId, f64>,
    /// Opening margins; `gross` seeds the state margin.
    #[serde(default)]
    pub margins: BTreeMap<String, f64>,
    /// Opening headcount.
    pub headcount: u64,
    /// Opening capacity per product.
    #[serde(default)]
    pub capacity: BTreeMap<ProductId, f64>,
}

/// Service-level targets for operational constraints.
///
/// # Invariants
/// - `min` lies in `[0, 1]` after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaTargets {
    /// Minimum acceptable service level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

/// Operational constraints handed to agents and the policy engine.
///
/// # Invariants
/// - Unset options disable the corresponding checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Maximum absolute headcount change per action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hiring_velocity_max: Option<i64>,
    /// Procurement lead time in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procurement_lead_time_days: Option<u32>,
    /// Minimum working capital.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_capital_min: Option<f64>,
    /// Service-level targets.
    #[serde(default)]
    pub sla_targets: SlaTargets,
    /// Compliance strictness in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_strictness: Option<f64>,
}

/// Per-field maximum relative change limits.
///
/// # Invariants
/// - Fractions are non-negative after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxPercentChange {
    /// Maximum relative price change per product and action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<f64>,
}

/// Recognized policy options gating agent actions.
///
/// # Invariants
/// - An unset option disables its check; no defaults are injected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    /// Maximum total budget allocation per action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_limit_monthly: Option<f64>,
    /// Estimated-impact threshold above which actions escalate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_threshold: Option<f64>,
    /// Relative-change limits.
    #[serde(default)]
    pub max_percent_change: MaxPercentChange,
    /// Risk-score threshold above which actions escalate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_appetite: Option<f64>,
    /// Minimum runway invariant in months.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_runway_months: Option<f64>,
}

/// Company blueprint: who is being simulated and under which rules.
///
/// # Invariants
/// - Validated by [`Blueprint::validate`] before an engine is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Industry label selecting the pluggable industry model.
    pub industry: String,
    /// Initial company conditions.
    pub initial_conditions: InitialConditions,
    /// Operational constraints.
    #[serde(default)]
    pub constraints: Constraints,
    /// Policy options.
    #[serde(default)]
    pub policies: PolicySet,
    /// Market exposure fraction in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_exposure: Option<f64>,
    /// Numeric parameters consumed by the industry model.
    #[serde(default)]
    pub industry_params: BTreeMap<String, f64>,
}

impl Blueprint {
    /// Validates the blueprint, failing fast on out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.industry.is_empty() {
            return Err(InputError::MissingField {
                field: "industry".to_string(),
            });
        }
        ensure_non_negative("initial_conditions.cash", self.initial_conditions.cash)?;
        ensure_non_negative("initial_conditions.monthly_burn", self.initial_conditions.monthly_burn)?;
        if let Some(exposure) = self.market_exposure {
            ensure_fraction("market_exposure", exposure)?;
        }
        if let Some(min) = self.constraints.sla_targets.min {
            ensure_fraction("constraints.sla_targets.min", min)?;
        }
        if let Some(strictness) = self.constraints.compliance_strictness {
            ensure_fraction("constraints.compliance_strictness", strictness)?;
        }
        if let Some(appetite) = self.policies.risk_appetite {
            ensure_fraction("policies.risk_appetite", appetite)?;
        }
        if let Some(limit) = self.policies.spend_limit_monthly {
            ensure_non_negative("policies.spend_limit_monthly", limit)?;
        }
        if let Some(max) = self.policies.max_percent_change.pricing {
            ensure_non_negative("policies.max_percent_change.pricing", max)?;
        }
        if let Some(min) = self.policies.min_runway_months {
            ensure_non_negative("policies.min_runway_months", min)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Timeline
// ============================================================================

/// Event timeline bounding a run in wall-clock time.
///
/// # Invariants
/// - `start_date < end_date` and every event passes validation after
///   [`Timeline::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// First day of the run.
    pub start_date: SimTime,
    /// Last day of the run.
    pub end_date: SimTime,
    /// Scheduled world events.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Timeline {
    /// Validates the timeline and returns a normalized copy: events sorted by
    /// timestamp (stable) with missing ids minted as `evt-<n>` in that order.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when the date range is inverted or any event is
    /// out of range.
    pub fn normalized(&self) -> Result<Self, InputError> {
        if self.end_date <= self.start_date {
            return Err(InputError::InvertedDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let mut events = self.events.clone();
        events.sort_by_key(|event| event.timestamp);
        for (index, event) in events.iter_mut().enumerate() {
            validate_event(index, event)?;
            if event.id.is_none() {
                event.id = Some(EventId::new(format!("evt-{index}")));
            }
        }
        Ok(Self {
            start_date: self.start_date,
            end_date: self.end_date,
            events,
        })
    }
}

/// Validates one event's scalar fields.
fn validate_event(index: usize, event: &Event) -> Result<(), InputError> {
    if !(0.0..=1.0).contains(&event.severity) {
        return Err(InputError::EventSeverityOutOfRange {
            index,
            severity: event.severity,
        });
    }
    if event.duration_days == 0 {
        return Err(InputError::EventDurationNotPositive {
            index,
        });
    }
    Ok(())
}

/// Fails when a value is negative or non-finite.
fn ensure_non_negative(field: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::FieldOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

/// Fails when a value lies outside `[0, 1]`.
fn ensure_fraction(field: &str, value: f64) -> Result<(), InputError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(InputError::FieldOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invalid-input errors raised at construction time.
///
/// # Invariants
/// - Variants are stable for programmatic handling and exit-code mapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// A required field is missing or empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Dotted path of the missing field.
        field: String,
    },
    /// A numeric field lies outside its allowed range.
    #[error("field {field} out of range: {value}")]
    FieldOutOfRange {
        /// Dotted path of the offending field.
        field: String,
        /// Rejected value.
        value: f64,
    },
    /// Timeline end precedes (or equals) its start.
    #[error("timeline end {end} does not follow start {start}")]
    InvertedDateRange {
        /// Timeline start date.
        start: SimTime,
        /// Timeline end date.
        end: SimTime,
    },
    /// An event's severity lies outside `[0, 1]`.
    #[error("event {index} severity out of range: {severity}")]
    EventSeverityOutOfRange {
        /// Index of the event in timestamp order.
        index: usize,
        /// Rejected severity.
        severity: f64,
    },
    /// An event's duration is not positive.
    #[error("event {index} duration must be positive")]
    EventDurationNotPositive {
        /// Index of the event in timestamp order.
        index: usize,
    },
    /// An event signal is missing its release time.
    #[error("event {index} signal {signal} is malformed: {detail}")]
    MalformedSignal {
        /// Index of the event in timestamp order.
        index: usize,
        /// Index of the signal within the event.
        signal: usize,
        /// Validation detail.
        detail: String,
    },
}
