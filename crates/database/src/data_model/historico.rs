use chrono::{DateTime, Utc};
use model::historico::HistoricoEntregado;
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct HistoricoRow {
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
    pub mes_cierre: Option<String>,
}

impl HistoricoRow {
    pub fn to_model(self) -> HistoricoEntregado {
        HistoricoEntregado {
            id: self.id,
            remito_id: self.remito_id,
            numero: self.numero,
            cliente: self.cliente,
            direccion_snapshot: self.direccion_snapshot,
            localidad: self.localidad,
            provincia: self.provincia,
            observaciones: self.observaciones,
            lat: self.lat,
            lng: self.lng,
            carrier_nombre: self.carrier_nombre,
            es_urgente: self.es_urgente,
            es_prioridad: self.es_prioridad,
            obs_entrega: self.obs_entrega,
            estado_al_archivar: self.estado_al_archivar,
            fecha_ingreso: self.fecha_ingreso,
            fecha_armado: self.fecha_armado,
            fecha_entregado: self.fecha_entregado,
            fecha_archivado: self.fecha_archivado,
            mes_cierre: self.mes_cierre,
        }
    }
}
