use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::remito::VentanaTipo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RutaEstado {
    Generando,
    Generada,
    EnCurso,
    Completada,
    Cancelada,
}

impl RutaEstado {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generando => "generando",
            Self::Generada => "generada",
            Self::EnCurso => "en_curso",
            Self::Completada => "completada",
            Self::Cancelada => "cancelada",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "generando" => Some(Self::Generando),
            "generada" => Some(Self::Generada),
            "en_curso" => Some(Self::EnCurso),
            "completada" => Some(Self::Completada),
            "cancelada" => Some(Self::Cancelada),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParadaEstado {
    Pendiente,
    EnCamino,
    Entregada,
    Fallida,
    Saltada,
}

impl ParadaEstado {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::EnCamino => "en_camino",
            Self::Entregada => "entregada",
            Self::Fallida => "fallida",
            Self::Saltada => "saltada",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(Self::Pendiente),
            "en_camino" => Some(Self::EnCamino),
            "entregada" => Some(Self::Entregada),
            "fallida" => Some(Self::Fallida),
            "saltada" => Some(Self::Saltada),
            _ => None,
        }
    }
}

/// One generated route for a given date, with its config snapshot and
/// aggregate stats. Stops and exclusions are children with FK cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruta {
    pub id: i32,
    pub fecha: NaiveDate,
    pub estado: RutaEstado,
    pub total_paradas: i32,
    pub total_excluidos: i32,
    pub duracion_estimada_min: Option<i32>,
    pub distancia_total_km: Option<f64>,
    pub gmaps_links: Vec<String>,
    /// Closed (lng, lat) line from the depot through every stop and back.
    pub ruta_linea: Option<Vec<(f64, f64)>>,
    pub config_snapshot: serde_json::Value,
    pub api_cost_estimate: Option<f64>,
    pub deposito_lat: f64,
    pub deposito_lng: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A sequenced stop. The `*_snapshot` fields freeze the remito as it was
/// at generation commit time and are never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RutaParada {
    pub id: i32,
    pub ruta_id: i32,
    pub remito_id: Option<i32>,
    pub remito_numero: Option<String>,
    pub orden: i32,
    pub lat_snapshot: Option<f64>,
    pub lng_snapshot: Option<f64>,
    pub cliente_snapshot: Option<String>,
    pub direccion_snapshot: Option<String>,
    pub observaciones_snapshot: Option<String>,
    pub minutos_desde_anterior: f64,
    pub tiempo_espera_min: f64,
    pub minutos_acumulados: f64,
    pub distancia_desde_anterior_km: f64,
    pub es_urgente: bool,
    pub es_prioridad: bool,
    pub ventana_tipo: Option<VentanaTipo>,
    pub estado: ParadaEstado,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RutaExcluido {
    pub id: i32,
    pub ruta_id: i32,
    pub remito_id: Option<i32>,
    pub remito_numero: Option<String>,
    pub cliente_snapshot: Option<String>,
    pub direccion_snapshot: Option<String>,
    pub motivo: String,
    pub distancia_km: Option<f64>,
    pub observaciones_snapshot: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
