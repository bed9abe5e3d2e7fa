// crates/venture-sim-core/src/runtime/timelock.rs
// ============================================================================
// Module: Venture Sim Time-Lock
// Description: Future-blind event filtering with authenticated sealing.
// Purpose: Guarantee that agents never observe events or signals from the
//          future, while keeping sealed content recoverable by the lock alone.
// Dependencies: crate::core, base64, chacha20poly1305, serde_json
// ============================================================================

//! ## Overview
//! The time-lock is information-hiding, not network security: sealing future
//! events prevents accidental disclosure through serialization or logs, and
//! the authenticated cipher makes tampering with a "future" event detectable
//! when it is eventually unsealed. Signals may surface before their parent
//! event does: the lock decrypts sealed parents internally and releases only
//! signals whose release time has passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::Key;
use chacha20poly1305::Nonce;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::aead::KeyInit;
use serde_json::Value;
use thiserror::Error;

use crate::core::Event;
use crate::core::Signal;
use crate::core::SimTime;
use crate::core::TimelineEvent;
use crate::core::identifiers::EventId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Time-lock errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling. Cipher failures carry no
///   plaintext or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelockError {
    /// Event payload could not be serialized for sealing.
    #[error("event serialization failed: {0}")]
    Serialization(String),
    /// AEAD sealing failed.
    #[error("event sealing failed")]
    SealFailed,
    /// AEAD opening failed (wrong key or tampered ciphertext).
    #[error("event unsealing failed: ciphertext rejected")]
    UnsealFailed,
    /// Sealed payload was not valid base64.
    #[error("sealed payload encoding invalid: {0}")]
    Encoding(String),
    /// An event reached sealing without an identifier.
    #[error("event at {timestamp} has no identifier; normalize the timeline first")]
    MissingEventId {
        /// Timestamp of the offending event.
        timestamp: SimTime,
    },
    /// A structure handed to an agent carries a future timestamp.
    #[error("future timestamp at {path}: {value} > {current}")]
    FutureLeak {
        /// JSON path of the offending field.
        path: String,
        /// Offending timestamp text.
        value: String,
        /// Current simulation time.
        current: SimTime,
    },
}

// ============================================================================
// SECTION: Time-Lock
// ============================================================================

/// Field names treated as timestamps by [`TimeLock::verify_no_future_access`].
const TIMESTAMP_FIELDS: [&str; 3] = ["timestamp", "time", "date"];

/// Run-scoped future-blindness enforcement.
///
/// # Invariants
/// - One lock per run; the key never leaves the lock except into checkpoints.
/// - Per-event nonces derive from the event index and are unique under the
///   run-scoped key.
#[derive(Debug, Clone)]
pub struct TimeLock {
    /// 256-bit ChaCha20-Poly1305 key.
    key: [u8; 32],
}

impl TimeLock {
    /// Creates a time-lock around a run-scoped key.
    #[must_use]
    pub const fn new(key: [u8; 32]) -> Self {
        Self {
            key,
        }
    }

    /// Returns the run-scoped key for checkpoint persistence.
    #[must_use]
    pub const fn key(&self) -> [u8; 32] {
        self.key
    }

    /// Rewrites a timeline: events at or before `current_time` pass through
    /// verbatim; later events are replaced by sealed ciphertext entries.
    ///
    /// # Errors
    ///
    /// Returns [`TimelockError`] when an event lacks an id or sealing fails.
    pub fn seal_future_events(
        &self,
        events: &[Event],
        current_time: SimTime,
    ) -> Result<Vec<TimelineEvent>, TimelockError> {
        let mut sealed = Vec::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            if event.timestamp <= current_time {
                sealed.push(TimelineEvent::Plain {
                    event: event.clone(),
                });
            } else {
                sealed.push(self.seal_event(index, event)?);
            }
        }
        Ok(sealed)
    }

    /// Seals one event under the run key with its index-derived nonce.
    fn seal_event(&self, index: usize, event: &Event) -> Result<TimelineEvent, TimelockError> {
        let event_id = event.id.clone().ok_or(TimelockError::MissingEventId {
            timestamp: event.timestamp,
        })?;
        let plaintext = serde_json::to_vec(event)
            .map_err(|err| TimelockError::Serialization(err.to_string()))?;
        let nonce_bytes = event_nonce(index);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|_| TimelockError::SealFailed)?;
        Ok(TimelineEvent::Sealed {
            event_id,
            timestamp: event.timestamp,
            nonce: BASE64.encode(nonce_bytes),
            ciphertext: BASE64.encode(ciphertext),
        })
    }

    /// Opens a sealed entry back into its plaintext event.
    ///
    /// # Errors
    ///
    /// Returns [`TimelockError::UnsealFailed`] on tampered ciphertext and
    /// [`TimelockError::Encoding`] on malformed base64.
    pub fn unseal_event(
        &self,
        nonce: &str,
        ciphertext: &str,
    ) -> Result<Event, TimelockError> {
        let nonce_bytes =
            BASE64.decode(nonce).map_err(|err| TimelockError::Encoding(err.to_string()))?;
        let cipher_bytes =
            BASE64.decode(ciphertext).map_err(|err| TimelockError::Encoding(err.to_string()))?;
        if nonce_bytes.len() != 12 {
            return Err(TimelockError::Encoding("nonce must be 12 bytes".to_string()));
        }
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), cipher_bytes.as_slice())
            .map_err(|_| TimelockError::UnsealFailed)?;
        serde_json::from_slice(&plaintext)
            .map_err(|err| TimelockError::Serialization(err.to_string()))
    }

    /// Returns only plaintext events with `timestamp <= current_time`.
    #[must_use]
    pub fn accessible_events(
        &self,
        events: &[TimelineEvent],
        current_time: SimTime,
    ) -> Vec<Event> {
        events
            .iter()
            .filter_map(|entry| match entry {
                TimelineEvent::Plain { event } if event.timestamp <= current_time => {
                    Some(event.clone())
                }
                TimelineEvent::Plain { .. } | TimelineEvent::Sealed { .. } => None,
            })
            .collect()
    }

    /// Returns the signals of an entry released by `current_time`.
    ///
    /// Sealed parents are opened internally: the lock holds the key, so a
    /// signal can surface before its parent event does.
    ///
    /// # Errors
    ///
    /// Returns [`TimelockError`] when a sealed parent fails to open.
    pub fn accessible_signals(
        &self,
        entry: &TimelineEvent,
        current_time: SimTime,
    ) -> Result<Vec<Signal>, TimelockError> {
        let event = match entry {
            TimelineEvent::Plain { event } => event.clone(),
            TimelineEvent::Sealed { nonce, ciphertext, .. } => {
                self.unseal_event(nonce, ciphertext)?
            }
        };
        Ok(event
            .signals
            .into_iter()
            .filter(|signal| signal.release_time <= current_time)
            .collect())
    }

    /// Released signals grouped by parent event id across a whole timeline.
    ///
    /// # Errors
    ///
    /// Returns [`TimelockError`] when a sealed parent fails to open.
    pub fn released_signals_by_event(
        &self,
        events: &[TimelineEvent],
        current_time: SimTime,
    ) -> Result<Vec<(EventId, Vec<Signal>)>, TimelockError> {
        let mut released = Vec::new();
        for entry in events {
            let signals = self.accessible_signals(entry, current_time)?;
            if signals.is_empty() {
                continue;
            }
            if let Some(event_id) = entry.event_id() {
                released.push((event_id.clone(), signals));
            }
        }
        Ok(released)
    }

    /// Recursively rejects any structure carrying a timestamp-named field
    /// greater than `current_time`. Runs on all data handed to agents.
    ///
    /// # Errors
    ///
    /// Returns [`TimelockError::FutureLeak`] naming the offending path.
    pub fn verify_no_future_access(
        agent_input: &Value,
        current_time: SimTime,
    ) -> Result<(), TimelockError> {
        check_timestamps(agent_input, current_time, "$")
    }
}

/// Deterministic 12-byte nonce for the event at `index`.
///
/// Uniqueness holds because the key is run-scoped and indexes are unique
/// within a timeline.
fn event_nonce(index: usize) -> [u8; 12] {
    let mut nonce = [0_u8; 12];
    let index = u64::try_from(index).unwrap_or(u64::MAX);
    nonce[4..].copy_from_slice(&index.to_le_bytes());
    nonce
}

/// Walks a JSON tree looking for future-dated timestamp fields.
fn check_timestamps(value: &Value, current_time: SimTime, path: &str) -> Result<(), TimelockError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                if TIMESTAMP_FIELDS.contains(&key.as_str())
                    && let Some(text) = child.as_str()
                    && let Ok(stamp) = SimTime::parse(text)
                    && stamp > current_time
                {
                    return Err(TimelockError::FutureLeak {
                        path: child_path,
                        value: text.to_string(),
                        current: current_time,
                    });
                }
                check_timestamps(child, current_time, &child_path)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                check_timestamps(item, current_time, &format!("{path}[{index}]"))?;
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
    }
}
