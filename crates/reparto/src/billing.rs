//! Billing traces for chargeable external calls. Appends are best-effort:
//! a failed insert is logged and swallowed, never propagated into the
//! business flow.

use log::warn;
use model::billing::BillingTrace;

use crate::store::BillingRepo;

/// Estimated USD per unit, keyed by `service_sku`.
const COST_PER_UNIT: &[(&str, f64)] = &[
    ("google_geocode", 0.005),
    ("google_matrix", 0.005),
    ("ors_geocode", 0.0),
    ("ors_matrix", 0.0),
    ("mapbox_geocode", 0.00075),
    ("mapbox_matrix", 0.00075),
    ("openai_classify", 0.00000015),
];

pub fn estimated_cost(service: &str, sku: &str, units: i32) -> f64 {
    let key = format!("{service}_{sku}");
    COST_PER_UNIT
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, unit_cost)| unit_cost * units as f64)
        .unwrap_or(0.0)
}

#[allow(clippy::too_many_arguments)]
pub async fn record<S>(
    store: &S,
    run_id: &str,
    stage: &str,
    service: &str,
    sku: &str,
    units: i32,
    response_code: Option<i32>,
    latency_ms: i32,
) where
    S: BillingRepo + Sync + ?Sized,
{
    let trace = BillingTrace {
        id: 0,
        run_id: Some(run_id.to_owned()),
        stage: Some(stage.to_owned()),
        service: service.to_owned(),
        sku: Some(sku.to_owned()),
        units,
        response_code,
        latency_ms: Some(latency_ms),
        estimated_cost: Some(estimated_cost(service, sku, units)),
        created_at: None,
    };
    if let Err(why) = store.append_billing(&trace).await {
        warn!("billing trace append failed ({service}/{sku}): {why}");
    }
}
