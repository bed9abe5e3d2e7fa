// crates/venture-sim-industry/src/manufacturing.rs
// ============================================================================
// Module: Manufacturing Industry Model
// Description: Stochastic lead-time, supplier, and inventory dynamics.
// Purpose: Update fulfillment, service level, and costs per tick using the
//          run RNG for lead times and supplier reliability.
// Dependencies: venture-sim-core, serde_json
// ============================================================================

//! ## Overview
//! Manufacturing is the stochastic model: replenishment lead times draw from
//! a normal distribution and supplier delivery from a Bernoulli trial, both on
//! the run RNG so replays reproduce the same supply history. Shortfalls below
//! safety stock incur expedite costs.

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
// SECTION: Manufacturing Model
// ============================================================================

/// Reference manufacturing dynamics.
///
/// # Invariants
/// - All randomness flows through the provided run RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManufacturingModel;

impl IndustryModel for ManufacturingModel {
    fn industry(&self) -> &str {
        "manufacturing"
    }

    fn update_state(
        &self,
        state: &CompanyState,
        days_elapsed: u32,
        params: &IndustryParams,
        rng: &mut SimRng,
    ) -> Result<StateOverrides, IndustryError> {
        let demand = param(params, "demand", 1000.0);

        let base_lead_time = param(params, "base_lead_time_days", 30.0);
        let lead_time_std = param(params, "lead_time_std_days", 5.0);
        let actual_lead_time = rng.normal(base_lead_time, lead_time_std).round().max(1.0);

        let supplier_reliability = param(params, "supplier_reliability", 0.95);
        let supplier_delivers = rng.next_f64() < supplier_reliability;

        let default_product = ProductId::new("default");
        let safety_stock = param(params, "safety_stock", 500.0);
        let mut current_inventory =
            state.inventory.get(&default_product).copied().unwrap_or(safety_stock);

        if supplier_delivers {
            current_inventory += param(params, "order_quantity", 1000.0);
        }

        let fulfilled = demand.min(current_inventory);
        current_inventory -= fulfilled;
        let backlog = (demand - fulfilled).max(0.0);
        let service_level = fulfilled / demand.max(1.0);

        let expedite_cost = if current_inventory < safety_stock {
            (safety_stock - current_inventory) * param(params, "expedite_cost_per_unit", 10.0)
        } else {
            0.0
        };

        let monthly_factor = DAYS_PER_MONTH / f64::from(days_elapsed.max(1));
        let unit_price = param(params, "unit_price", 100.0);
        let revenue_monthly = fulfilled * unit_price * monthly_factor;

        let cogs = fulfilled * param(params, "cogs_per_unit", 60.0);
        let holding_cost = current_inventory * param(params, "holding_cost_per_unit", 1.0);
        let total_costs = cogs + holding_cost + expedite_cost;
        let costs_monthly = total_costs.mul_add(monthly_factor, state.costs_monthly);

        let mut lead_times = BTreeMap::new();
        let lead_days = lead_time_days(actual_lead_time);
        lead_times.insert(default_product.clone(), lead_days);

        let mut metadata = state.metadata.clone();
        metadata.insert("fulfilled".to_string(), json!(fulfilled));
        metadata.insert("expedite_cost".to_string(), json!(expedite_cost));
        metadata.insert("supplier_reliability".to_string(), json!(supplier_reliability));
        metadata.insert("safety_stock".to_string(), json!(safety_stock));

        Ok(StateOverrides {
            revenue_monthly: Some(revenue_monthly),
            costs_monthly: Some(costs_monthly),
            inventory: Some(single(&default_product, current_inventory)),
            backlog: Some(single(&default_product, backlog)),
            lead_times: Some(lead_times),
            service_level: Some(service_level),
            metadata: Some(metadata),
            ..StateOverrides::default()
        })
    }
}

/// Converts a positive lead-time float into whole days.
fn lead_time_days(value: f64) -> u32 {
    if value <= 1.0 {
        1
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        // In-range by the guards above.
        #[allow(clippy::cast_possible_truncation, reason = "bounds checked above")]
        #[allow(clippy::cast_sign_loss, reason = "value is >= 1.0 here")]
        {
            value as u32
        }
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
