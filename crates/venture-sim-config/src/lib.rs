// crates/venture-sim-config/src/lib.rs
// ============================================================================
// Module: Venture Sim Config
// Description: Blueprint/timeline loading, event packs, and event authoring.
// Purpose: Turn external JSON configuration into validated core inputs,
//          failing fast on invalid input.
// Dependencies: venture-sim-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Configuration enters as JSON files: a blueprint describing the company and
//! a timeline describing the world. Event packs merge into custom timelines
//! sorted by timestamp, and the [`builder::EventBuilder`] authors custom
//! events with the same validation the loader applies. Every failure here is
//! an invalid-input error, never a runtime surprise.

/// Validating event authoring.
pub mod builder;
/// File loading and event-pack merging.
pub mod loader;

pub use builder::BuilderError;
pub use builder::EventBuilder;
pub use loader::ConfigError;
pub use loader::load_blueprint;
pub use loader::load_timeline;
pub use loader::merge_events;
pub use loader::staged_signals;
pub use loader::validate_timeline;
