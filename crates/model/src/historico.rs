use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Archived, delivered remito. Column set is the superset of everything
/// the active record tracked, so a restore loses nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricoEntregado {
    pub id: i32,
    pub remito_id: Option<i32>,
    pub numero: String,
    pub cliente: Option<String>,
    pub direccion_snapshot: Option<String>,
    pub localidad: Option<String>,
    pub provincia: Option<String>,
    pub observaciones: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub carrier_nombre: Option<String>,
    pub es_urgente: bool,
    pub es_prioridad: bool,
    pub obs_entrega: Option<String>,
    pub estado_al_archivar: Option<String>,
    pub fecha_ingreso: Option<DateTime<Utc>>,
    pub fecha_armado: Option<DateTime<Utc>>,
    pub fecha_entregado: DateTime<Utc>,
    pub fecha_archivado: Option<DateTime<Utc>>,
    /// Billing month the delivery closed under, `YYYY-MM`.
    pub mes_cierre: Option<String>,
}
