// crates/venture-sim-industry/src/saas.rs
// ============================================================================
// Module: SaaS Industry Model
// Description: Pipeline-to-bookings-to-revenue dynamics for SaaS companies.
// Purpose: Update recurring revenue, acquisition cost, and growth per tick.
// Dependencies: venture-sim-core, serde_json
// ============================================================================

//! ## Overview
//! The SaaS model recognizes monthly recurring revenue from ARR, discounts it
//! by churn, converts pipeline into bookings over the sales cycle, and derives
//! acquisition cost from marketing spend. Growth is bookings relative to ARR.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::json;
use venture_sim_core::CompanyState;
use venture_sim_core::IndustryError;
use venture_sim_core::IndustryModel;
use venture_sim_core::IndustryParams;
use venture_sim_core::ProductId;
use venture_sim_core::SimRng;
use venture_sim_core::StateOverrides;
use venture_sim_core::core::state::GROWTH_RATE_KEY;

// ============================================================================
// SECTION: SaaS Model
// ============================================================================

/// Reference SaaS dynamics.
///
/// # Invariants
/// - Pure: identical inputs yield identical overrides; the RNG is not drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaasModel;

impl IndustryModel for SaasModel {
    fn industry(&self) -> &str {
        "saas"
    }

    fn update_state(
        &self,
        state: &CompanyState,
        days_elapsed: u32,
        params: &IndustryParams,
        _rng: &mut SimRng,
    ) -> Result<StateOverrides, IndustryError> {
        let pipeline_value = param(params, "pipeline_value", 0.0);
        let conversion_rate = param(params, "conversion_rate", 0.2);
        let sales_cycle_days = param(params, "sales_cycle_days", 60.0).max(1.0);

        let bookings =
            pipeline_value * conversion_rate * (f64::from(days_elapsed) / sales_cycle_days);

        let arr = param(params, "arr", 0.0);
        let mrr = arr / 12.0;
        let revenue_monthly = mrr * (1.0 - state.churn_rate);

        let marketing_spend = param(params, "marketing_spend", 0.0);
        let new_customers = param(params, "new_customers", 1.0).max(1.0);
        let cac = marketing_spend / new_customers;

        let growth_rate = if arr > 0.0 { bookings / arr.max(1.0) } else { 0.0 };

        let mut metadata = state.metadata.clone();
        metadata.insert(GROWTH_RATE_KEY.to_string(), json!(growth_rate));
        metadata.insert("arr".to_string(), json!(arr));
        metadata.insert("mrr".to_string(), json!(mrr));
        metadata.insert("bookings".to_string(), json!(bookings));
        metadata.insert("pipeline_value".to_string(), json!(pipeline_value));

        let mut cac_map = BTreeMap::new();
        cac_map.insert(ProductId::new("default"), cac);

        Ok(StateOverrides {
            revenue_monthly: Some(revenue_monthly),
            cac: Some(cac_map),
            metadata: Some(metadata),
            ..StateOverrides::default()
        })
    }
}

/// Reads one numeric parameter with a default.
fn param(params: &IndustryParams, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}
