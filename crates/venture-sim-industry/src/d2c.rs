// crates/venture-sim-industry/src/d2c.rs
// ============================================================================
// Module: D2C Industry Model
// Description: Demand, fulfillment, and returns dynamics for D2C companies.
// Purpose: Update revenue, inventory, backlog, and acquisition cost per tick.
// Dependencies: venture-sim-core, serde_json
// ============================================================================

//! ## Overview
//! The D2C model forecasts seasonal demand, fulfills from inventory, books
//! returns back into stock, and derives acquisition cost from ad spend per
//! fulfilled order. Stockouts surface as backlog.

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
use venture_sim_core::core::time::DAYS_PER_MONTH;

// ============================================================================
// SECTION: D2C Model
// ============================================================================

/// Reference D2C dynamics.
///
/// # Invariants
/// - Pure: identical inputs yield identical overrides; the RNG is not drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct D2cModel;

impl IndustryModel for D2cModel {
    fn industry(&self) -> &str {
        "d2c"
    }

    fn update_state(
        &self,
        state: &CompanyState,
        days_elapsed: u32,
        params: &IndustryParams,
        _rng: &mut SimRng,
    ) -> Result<StateOverrides, IndustryError> {
        let base_demand = param(params, "base_demand", 1000.0);
        let seasonality = param(params, "seasonality_factor", 1.0);
        let demand = base_demand * seasonality;

        let default_product = ProductId::new("default");
        let inventory_level = state.inventory.get(&default_product).copied().unwrap_or(0.0);
        let fulfilled = demand.min(inventory_level);
        let stockout = (demand - inventory_level).max(0.0);

        let monthly_factor = DAYS_PER_MONTH / f64::from(days_elapsed.max(1));
        let avg_order_value = param(params, "avg_order_value", 100.0);
        let revenue_monthly = fulfilled * avg_order_value * monthly_factor;

        let return_rate = param(params, "return_rate", 0.1);
        let returns = fulfilled * return_rate;
        let net_revenue = revenue_monthly * (1.0 - return_rate);

        let ad_spend = param(params, "ad_spend", 0.0);
        let cac = ad_spend / fulfilled.max(1.0);

        let new_inventory = inventory_level - fulfilled + returns;

        let mut metadata = state.metadata.clone();
        metadata.insert("fulfilled".to_string(), json!(fulfilled));
        metadata.insert("stockout".to_string(), json!(stockout));
        metadata.insert("return_rate".to_string(), json!(return_rate));
        metadata.insert("avg_order_value".to_string(), json!(avg_order_value));

        Ok(StateOverrides {
            revenue_monthly: Some(net_revenue),
            inventory: Some(single(&default_product, new_inventory)),
            backlog: Some(single(&default_product, stockout)),
            cac: Some(single(&default_product, cac)),
            demand: Some(single(&default_product, demand)),
            metadata: Some(metadata),
            ..StateOverrides::default()
        })
    }
}

/// Builds a single-product mapping.
fn single(product: &ProductId, value: f64) -> BTreeMap<ProductId, f64> {
    let mut map = BTreeMap::new();
    map.insert(product.clone(), value);
    map
}

/// Reads one numeric parameter with a default.
fn param(params: &IndustryParams, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}
