use chrono::{DateTime, Utc};
use model::config::{ConfigEntry, ConfigTipo};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
    pub tipo: String,
    pub descripcion: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConfigRow {
    pub fn to_model(self) -> ConfigEntry {
        ConfigEntry {
            key: self.key,
            value: self.value,
            tipo: ConfigTipo::parse(&self.tipo).unwrap_or(ConfigTipo::Str),
            descripcion: self.descripcion,
            updated_at: self.updated_at,
        }
    }
}
