// crates/venture-sim-industry/src/lib.rs
// ============================================================================
// Module: Venture Sim Industry Models
// Description: Reference industry dynamics plugging into the core engine.
// Purpose: Provide SaaS, D2C, and manufacturing implementations of the
//          IndustryModel interface.
// Dependencies: venture-sim-core
// ============================================================================

//! ## Overview
//! Industry models are pluggable collaborators: the core invokes one per tick
//! before the cash-flow step, handing it the committed state, elapsed days,
//! blueprint parameters, and the run RNG. Models return state overrides and
//! are pure with respect to their inputs, so replays stay bit-identical.

/// D2C demand/fulfillment/returns dynamics.
pub mod d2c;
/// Manufacturing lead-time and supply dynamics.
pub mod manufacturing;
/// SaaS pipeline and recurring-revenue dynamics.
pub mod saas;

use std::sync::Arc;

use venture_sim_core::IndustryModel;

pub use d2c::D2cModel;
pub use manufacturing::ManufacturingModel;
pub use saas::SaasModel;

/// Resolves a blueprint industry label to its reference model.
#[must_use]
pub fn model_for(industry: &str) -> Option<Arc<dyn IndustryModel>> {
    match industry {
        "saas" => Some(Arc::new(SaasModel)),
        "d2c" => Some(Arc::new(D2cModel)),
        "manufacturing" => Some(Arc::new(ManufacturingModel)),
        _ => None,
    }
}
