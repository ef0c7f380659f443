use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical name of the pickup pseudo-carrier (customer collects at the
/// depot). The seed, the classifier and the pipeline all use this one.
pub const RETIRO_EN_GALPON: &str = "RETIRO EN GALPON";
/// Canonical name of the own-fleet carrier.
pub const ENVIO_PROPIO: &str = "ENVIO PROPIO";
/// Sentinel carrier for orders whose transport could not be resolved.
pub const DESCONOCIDO: &str = "DESCONOCIDO";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: i32,
    pub nombre_canonico: String,
    pub aliases: Vec<String>,
    pub regex_pattern: Option<String>,
    pub es_externo: bool,
    pub es_pickup: bool,
    pub activo: bool,
    /// Lower value wins when several carrier regexes match.
    pub prioridad_regex: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Carrier {
    /// The names that keep an order inside the own-delivery flow: anything
    /// else detected by the classifier means a third-party carrier.
    pub fn es_flujo_propio(nombre_canonico: &str) -> bool {
        matches!(
            nombre_canonico,
            RETIRO_EN_GALPON | ENVIO_PROPIO | DESCONOCIDO
        )
    }
}
