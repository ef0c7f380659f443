use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of one chargeable external call. Inserts are
/// best-effort and never tied to the business transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingTrace {
    pub id: i64,
    pub run_id: Option<String>,
    pub stage: Option<String>,
    pub service: String,
    pub sku: Option<String>,
    pub units: i32,
    pub response_code: Option<i32>,
    pub latency_ms: Option<i32>,
    pub estimated_cost: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
}
