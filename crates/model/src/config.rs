use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTipo {
    Int,
    Float,
    Bool,
    Str,
}

impl ConfigTipo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "int" | "integer" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            "str" | "string" | "text" => Some(Self::Str),
            _ => None,
        }
    }
}

/// The closed set of persisted route-config keys.
pub const CONFIG_KEYS: [&str; 15] = [
    "tiempo_espera_min",
    "deposito_lat",
    "deposito_lng",
    "deposito_direccion",
    "hora_desde",
    "hora_hasta",
    "evitar_saltos_min",
    "vuelta_galpon_min",
    "proveedor_matrix",
    "utilizar_ventana",
    "distancia_max_km",
    "velocidad_urbana_kmh",
    "dm_block_size",
    "geocode_cache_days",
    "max_remitos_ruta",
];

/// One persisted `config_ruta` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub tipo: ConfigTipo,
    pub descripcion: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Typed view over the `config_ruta` rows, built on read with defaults
/// filled in for missing or mistyped keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub tiempo_espera_min: f64,
    pub deposito_lat: f64,
    pub deposito_lng: f64,
    pub deposito_direccion: String,
    pub hora_desde: String,
    pub hora_hasta: String,
    pub evitar_saltos_min: f64,
    pub vuelta_galpon_min: f64,
    pub proveedor_matrix: String,
    pub utilizar_ventana: bool,
    pub distancia_max_km: f64,
    pub velocidad_urbana_kmh: f64,
    pub dm_block_size: usize,
    pub geocode_cache_days: i64,
    pub max_remitos_ruta: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            tiempo_espera_min: 10.0,
            deposito_lat: -32.91973,
            deposito_lng: -68.81829,
            deposito_direccion: "Elpidio González 2753, Guaymallén, Mendoza"
                .to_owned(),
            hora_desde: "09:00".to_owned(),
            hora_hasta: "14:00".to_owned(),
            evitar_saltos_min: 25.0,
            vuelta_galpon_min: 25.0,
            proveedor_matrix: "ors".to_owned(),
            utilizar_ventana: true,
            distancia_max_km: 45.0,
            velocidad_urbana_kmh: 40.0,
            dm_block_size: 10,
            geocode_cache_days: 30,
            max_remitos_ruta: 40,
        }
    }
}

impl RouteConfig {
    pub fn from_entries(entries: &[ConfigEntry]) -> Self {
        let mut config = Self::default();
        for entry in entries {
            config.apply(&entry.key, &entry.value);
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        fn float(value: &str) -> Option<f64> {
            value.trim().parse().ok()
        }
        fn int(value: &str) -> Option<usize> {
            value.trim().parse().ok()
        }
        fn boolean(value: &str) -> Option<bool> {
            match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "si" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            }
        }

        match key {
            "tiempo_espera_min" => {
                if let Some(v) = float(value) {
                    self.tiempo_espera_min = v;
                }
            }
            "deposito_lat" => {
                if let Some(v) = float(value) {
                    self.deposito_lat = v;
                }
            }
            "deposito_lng" => {
                if let Some(v) = float(value) {
                    self.deposito_lng = v;
                }
            }
            "deposito_direccion" => self.deposito_direccion = value.to_owned(),
            "hora_desde" => self.hora_desde = value.to_owned(),
            "hora_hasta" => self.hora_hasta = value.to_owned(),
            "evitar_saltos_min" => {
                if let Some(v) = float(value) {
                    self.evitar_saltos_min = v;
                }
            }
            "vuelta_galpon_min" => {
                if let Some(v) = float(value) {
                    self.vuelta_galpon_min = v;
                }
            }
            "proveedor_matrix" => self.proveedor_matrix = value.to_owned(),
            "utilizar_ventana" => {
                if let Some(v) = boolean(value) {
                    self.utilizar_ventana = v;
                }
            }
            "distancia_max_km" => {
                if let Some(v) = float(value) {
                    self.distancia_max_km = v;
                }
            }
            "velocidad_urbana_kmh" => {
                if let Some(v) = float(value) {
                    self.velocidad_urbana_kmh = v;
                }
            }
            "dm_block_size" => {
                if let Some(v) = int(value) {
                    self.dm_block_size = v.max(1);
                }
            }
            "geocode_cache_days" => {
                if let Some(v) = value.trim().parse().ok() {
                    self.geocode_cache_days = v;
                }
            }
            "max_remitos_ruta" => {
                if let Some(v) = int(value) {
                    self.max_remitos_ruta = v;
                }
            }
            _ => {}
        }
    }

    pub fn merge_override(&mut self, over: &RouteConfigOverride) {
        if let Some(v) = over.tiempo_espera_min {
            self.tiempo_espera_min = v;
        }
        if let Some(v) = over.deposito_lat {
            self.deposito_lat = v;
        }
        if let Some(v) = over.deposito_lng {
            self.deposito_lng = v;
        }
        if let Some(v) = &over.hora_desde {
            self.hora_desde = v.clone();
        }
        if let Some(v) = &over.hora_hasta {
            self.hora_hasta = v.clone();
        }
        if let Some(v) = over.evitar_saltos_min {
            self.evitar_saltos_min = v;
        }
        if let Some(v) = over.vuelta_galpon_min {
            self.vuelta_galpon_min = v;
        }
        if let Some(v) = &over.proveedor_matrix {
            self.proveedor_matrix = v.clone();
        }
        if let Some(v) = over.utilizar_ventana {
            self.utilizar_ventana = v;
        }
        if let Some(v) = over.distancia_max_km {
            self.distancia_max_km = v;
        }
        if let Some(v) = over.velocidad_urbana_kmh {
            self.velocidad_urbana_kmh = v;
        }
        if let Some(v) = over.max_remitos_ruta {
            self.max_remitos_ruta = v;
        }
    }

    /// The JSON snapshot persisted with each generated route.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Per-request config override accepted by the route generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteConfigOverride {
    pub tiempo_espera_min: Option<f64>,
    pub deposito_lat: Option<f64>,
    pub deposito_lng: Option<f64>,
    pub hora_desde: Option<String>,
    pub hora_hasta: Option<String>,
    pub evitar_saltos_min: Option<f64>,
    pub vuelta_galpon_min: Option<f64>,
    pub proveedor_matrix: Option<String>,
    pub utilizar_ventana: Option<bool>,
    pub distancia_max_km: Option<f64>,
    pub velocidad_urbana_kmh: Option<f64>,
    pub max_remitos_ruta: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: &str, tipo: ConfigTipo) -> ConfigEntry {
        ConfigEntry {
            key: key.to_owned(),
            value: value.to_owned(),
            tipo,
            descripcion: None,
            updated_at: None,
        }
    }

    #[test]
    fn defaults_match_seed() {
        let config = RouteConfig::default();
        assert_eq!(config.tiempo_espera_min, 10.0);
        assert_eq!(config.distancia_max_km, 45.0);
        assert_eq!(config.dm_block_size, 10);
        assert_eq!(config.proveedor_matrix, "ors");
    }

    #[test]
    fn entries_override_defaults() {
        let config = RouteConfig::from_entries(&[
            entry("distancia_max_km", "30.5", ConfigTipo::Float),
            entry("utilizar_ventana", "false", ConfigTipo::Bool),
            entry("hora_hasta", "18:00", ConfigTipo::Str),
        ]);
        assert_eq!(config.distancia_max_km, 30.5);
        assert!(!config.utilizar_ventana);
        assert_eq!(config.hora_hasta, "18:00");
    }

    #[test]
    fn malformed_value_keeps_default() {
        let config =
            RouteConfig::from_entries(&[entry("dm_block_size", "diez", ConfigTipo::Int)]);
        assert_eq!(config.dm_block_size, 10);
    }

    #[test]
    fn request_override_wins() {
        let mut config = RouteConfig::default();
        config.merge_override(&RouteConfigOverride {
            evitar_saltos_min: Some(15.0),
            ..Default::default()
        });
        assert_eq!(config.evitar_saltos_min, 15.0);
    }
}
