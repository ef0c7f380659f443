use chrono::{DateTime, Utc};
use model::billing::BillingTrace;
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct BillingTraceRow {
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

impl BillingTraceRow {
    pub fn to_model(self) -> BillingTrace {
        BillingTrace {
            id: self.id,
            run_id: self.run_id,
            stage: self.stage,
            service: self.service,
            sku: self.sku,
            units: self.units,
            response_code: self.response_code,
            latency_ms: self.latency_ms,
            estimated_cost: self.estimated_cost,
            created_at: self.created_at,
        }
    }
}
