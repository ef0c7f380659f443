use chrono::{DateTime, Utc};
use model::carrier::Carrier;
use sqlx::{prelude::FromRow, types::Json};

#[derive(Debug, Clone, FromRow)]
pub struct CarrierRow {
    pub id: i32,
    pub nombre_canonico: String,
    pub aliases: Json<Vec<String>>,
    pub regex_pattern: Option<String>,
    pub es_externo: bool,
    pub es_pickup: bool,
    pub activo: bool,
    pub prioridad_regex: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CarrierRow {
    pub fn to_model(self) -> Carrier {
        Carrier {
            id: self.id,
            nombre_canonico: self.nombre_canonico,
            aliases: self.aliases.0,
            regex_pattern: self.regex_pattern,
            es_externo: self.es_externo,
            es_pickup: self.es_pickup,
            activo: self.activo,
            prioridad_regex: self.prioridad_regex,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
