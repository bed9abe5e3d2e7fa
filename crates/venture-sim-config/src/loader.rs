// crates/venture-sim-config/src/loader.rs
// ============================================================================
// Module: Config Loader
// Description: JSON file loading and event-pack merging.
// Purpose: Load blueprints and timelines from disk, merge event packs, and
//          validate timelines before they reach the engine.
// Dependencies: venture-sim-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Loading is strict: malformed JSON, schema mismatches, and validation
//! failures all surface as [`ConfigError`] with the offending path or field.
//! Merged timelines are sorted by timestamp with a stable order so replays of
//! the same inputs see the same event sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use thiserror::Error;
use venture_sim_core::Blueprint;
use venture_sim_core::Event;
use venture_sim_core::InputError;
use venture_sim_core::Signal;
use venture_sim_core::Timeline;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; all map to the
///   invalid-input exit code.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read {path}: {detail}")]
    Io {
        /// Offending file path.
        path: String,
        /// Underlying detail.
        detail: String,
    },
    /// File was not valid JSON for the expected shape.
    #[error("cannot parse {path}: {detail}")]
    Parse {
        /// Offending file path.
        path: String,
        /// Parser detail.
        detail: String,
    },
    /// Input failed core validation.
    #[error(transparent)]
    Invalid(#[from] InputError),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a blueprint from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError`] on read, parse, or validation failure.
pub fn load_blueprint(path: &Path) -> Result<Blueprint, ConfigError> {
    let text = read(path)?;
    let blueprint: Blueprint = parse(path, &text)?;
    blueprint.validate()?;
    Ok(blueprint)
}

/// Loads and normalizes a timeline from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError`] on read, parse, or validation failure.
pub fn load_timeline(path: &Path) -> Result<Timeline, ConfigError> {
    let text = read(path)?;
    let timeline: Timeline = parse(path, &text)?;
    Ok(timeline.normalized()?)
}

/// Reads a file into a string.
fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.display().to_string(),
        detail: err.to_string(),
    })
}

/// Parses a JSON payload into the expected shape.
fn parse<T>(path: &Path, text: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(text).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        detail: err.to_string(),
    })
}

// ============================================================================
// SECTION: Event Packs
// ============================================================================

/// Merges pack events with custom events, sorted by timestamp (stable: pack
/// order wins ties, then custom order).
#[must_use]
pub fn merge_events(base_events: &[Event], custom_events: &[Event]) -> Vec<Event> {
    let mut merged: Vec<Event> = Vec::with_capacity(base_events.len() + custom_events.len());
    merged.extend_from_slice(base_events);
    merged.extend_from_slice(custom_events);
    merged.sort_by_key(|event| event.timestamp);
    merged
}

/// Validates a candidate event list the way timeline normalization will.
///
/// # Errors
///
/// Returns [`InputError`] naming the first offending event.
pub fn validate_timeline(events: &[Event]) -> Result<(), InputError> {
    for (index, event) in events.iter().enumerate() {
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
    }
    Ok(())
}

/// Returns an event's signals sorted by release time.
#[must_use]
pub fn staged_signals(event: &Event) -> Vec<Signal> {
    let mut signals = event.signals.clone();
    signals.sort_by_key(|signal| signal.release_time);
    signals
}
