// crates/venture-sim-core/src/core/time.rs
// ============================================================================
// Module: Venture Sim Time Model
// Description: Canonical wall-clock timestamps for simulation state and logs.
// Purpose: Provide deterministic, replayable time values across Venture Sim records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Simulation time is explicit everywhere: the core never reads the host
//! clock. [`SimTime`] wraps an RFC 3339 instant and advances only through the
//! tick loop or caller-supplied values, which keeps replays byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Days per month used by the fixed cash-flow step.
pub const DAYS_PER_MONTH: f64 = 30.0;

// ============================================================================
// SECTION: Simulation Time
// ============================================================================

/// Canonical wall-clock timestamp used in simulation state and ledger records.
///
/// # Invariants
/// - Values are explicitly provided by callers or derived from tick advancement;
///   the core never reads the host clock.
/// - The wire form is an RFC 3339 string, stable under canonical JSON hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(OffsetDateTime);

impl SimTime {
    /// Creates a simulation time from an [`OffsetDateTime`].
    #[must_use]
    pub const fn new(value: OffsetDateTime) -> Self {
        Self(value)
    }

    /// Parses a simulation time from an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns [`TimeParseError`] when the input is not valid RFC 3339.
    pub fn parse(value: &str) -> Result<Self, TimeParseError> {
        OffsetDateTime::parse(value, &Rfc3339).map(Self).map_err(|err| TimeParseError {
            input: value.to_string(),
            detail: err.to_string(),
        })
    }

    /// Returns the inner [`OffsetDateTime`].
    #[must_use]
    pub const fn inner(&self) -> OffsetDateTime {
        self.0
    }

    /// Returns this time advanced by the given number of days.
    #[must_use]
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Returns the number of whole days from `earlier` to `self`.
    #[must_use]
    pub fn days_since(&self, earlier: Self) -> i64 {
        (self.0 - earlier.0).whole_days()
    }

    /// Formats the timestamp as an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns [`TimeFormatError`] when the instant cannot be formatted
    /// (out-of-range year for RFC 3339).
    pub fn to_rfc3339(&self) -> Result<String, TimeFormatError> {
        self.0.format(&Rfc3339).map_err(|err| TimeFormatError {
            detail: err.to_string(),
        })
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<unformattable time>"),
        }
    }
}

impl Serialize for SimTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = self.to_rfc3339().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for SimTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error raised when a timestamp string is not valid RFC 3339.
///
/// # Invariants
/// - `input` echoes the rejected text for caller diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rfc3339 timestamp {input:?}: {detail}")]
pub struct TimeParseError {
    /// Rejected input text.
    pub input: String,
    /// Parser detail message.
    pub detail: String,
}

/// Error raised when a timestamp cannot be rendered as RFC 3339.
///
/// # Invariants
/// - Only out-of-range instants trigger this error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timestamp formatting failed: {detail}")]
pub struct TimeFormatError {
    /// Formatter detail message.
    pub detail: String,
}
