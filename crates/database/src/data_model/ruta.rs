use chrono::{DateTime, NaiveDate, Utc};
use model::{
    remito::VentanaTipo,
    ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada},
};
use sqlx::{prelude::FromRow, types::Json};

#[derive(Debug, Clone, FromRow)]
pub struct RutaRow {
    pub id: i32,
    pub fecha: NaiveDate,
    pub estado: String,
    pub total_paradas: i32,
    pub total_excluidos: i32,
    pub duracion_estimada_min: Option<i32>,
    pub distancia_total_km: Option<f64>,
    pub gmaps_links: Json<Vec<String>>,
    pub ruta_geom: Option<Json<Vec<(f64, f64)>>>,
    pub config_snapshot: Json<serde_json::Value>,
    pub api_cost_estimate: Option<f64>,
    pub deposito_lat: f64,
    pub deposito_lng: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RutaRow {
    pub fn to_model(self) -> Ruta {
        Ruta {
            id: self.id,
            fecha: self.fecha,
            estado: RutaEstado::parse(&self.estado).unwrap_or(RutaEstado::Generando),
            total_paradas: self.total_paradas,
            total_excluidos: self.total_excluidos,
            duracion_estimada_min: self.duracion_estimada_min,
            distancia_total_km: self.distancia_total_km,
            gmaps_links: self.gmaps_links.0,
            ruta_linea: self.ruta_geom.map(|line| line.0),
            config_snapshot: self.config_snapshot.0,
            api_cost_estimate: self.api_cost_estimate,
            deposito_lat: self.deposito_lat,
            deposito_lng: self.deposito_lng,
            created_at: self.created_at,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RutaParadaRow {
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
    pub ventana_tipo: Option<String>,
    pub estado: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RutaParadaRow {
    pub fn to_model(self) -> RutaParada {
        RutaParada {
            id: self.id,
            ruta_id: self.ruta_id,
            remito_id: self.remito_id,
            remito_numero: self.remito_numero,
            orden: self.orden,
            lat_snapshot: self.lat_snapshot,
            lng_snapshot: self.lng_snapshot,
            cliente_snapshot: self.cliente_snapshot,
            direccion_snapshot: self.direccion_snapshot,
            observaciones_snapshot: self.observaciones_snapshot,
            minutos_desde_anterior: self.minutos_desde_anterior,
            tiempo_espera_min: self.tiempo_espera_min,
            minutos_acumulados: self.minutos_acumulados,
            distancia_desde_anterior_km: self.distancia_desde_anterior_km,
            es_urgente: self.es_urgente,
            es_prioridad: self.es_prioridad,
            ventana_tipo: self.ventana_tipo.as_deref().and_then(VentanaTipo::parse),
            estado: ParadaEstado::parse(&self.estado)
                .unwrap_or(ParadaEstado::Pendiente),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RutaExcluidoRow {
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

impl RutaExcluidoRow {
    pub fn to_model(self) -> RutaExcluido {
        RutaExcluido {
            id: self.id,
            ruta_id: self.ruta_id,
            remito_id: self.remito_id,
            remito_numero: self.remito_numero,
            cliente_snapshot: self.cliente_snapshot,
            direccion_snapshot: self.direccion_snapshot,
            motivo: self.motivo,
            distancia_km: self.distancia_km,
            observaciones_snapshot: self.observaciones_snapshot,
            created_at: self.created_at,
        }
    }
}
