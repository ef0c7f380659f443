use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Externally prepared order attributes, synced in bulk and merged into
/// the matching remito during pipeline step 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedidoListo {
    pub id: i32,
    pub remito_id: Option<i32>,
    pub numero_remito: String,
    pub cliente: Option<String>,
    pub domicilio: Option<String>,
    pub localidad: Option<String>,
    pub provincia: Option<String>,
    pub observaciones: Option<String>,
    pub transporte: Option<String>,
    pub fecha_remito: Option<NaiveDate>,
    pub synced_at: Option<DateTime<Utc>>,
    pub raw_data: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}
