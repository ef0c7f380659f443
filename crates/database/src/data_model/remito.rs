use chrono::{DateTime, Utc};
use model::remito::{Clasificacion, Lifecycle, Remito, VentanaTipo};
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct RemitoRow {
    pub id: i32,
    pub numero: String,
    pub cliente: Option<String>,
    pub telefono: Option<String>,
    pub direccion_raw: Option<String>,
    pub direccion_normalizada: Option<String>,
    pub localidad: Option<String>,
    pub provincia: Option<String>,
    pub observaciones: Option<String>,
    pub transporte_raw: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocode_provider: Option<String>,
    pub geocode_score: Option<f64>,
    pub geocode_formatted: Option<String>,
    pub geocode_has_street_num: Option<bool>,
    pub estado_clasificacion: String,
    pub estado_lifecycle: String,
    pub motivo_clasificacion: Option<String>,
    pub carrier_id: Option<i32>,
    pub ventana_raw: Option<String>,
    pub ventana_tipo: Option<String>,
    pub ventana_desde_min: Option<i32>,
    pub ventana_hasta_min: Option<i32>,
    pub llamar_antes: bool,
    pub es_urgente: bool,
    pub es_prioridad: bool,
    pub source: Option<String>,
    pub fecha_ingreso: Option<DateTime<Utc>>,
    pub fecha_armado: Option<DateTime<Utc>>,
    pub fecha_entregado: Option<DateTime<Utc>>,
    pub fecha_historico: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemitoRow {
    pub fn to_model(self) -> Remito {
        Remito {
            id: self.id,
            numero: self.numero,
            cliente: self.cliente,
            telefono: self.telefono,
            direccion_raw: self.direccion_raw,
            direccion_normalizada: self.direccion_normalizada,
            localidad: self.localidad,
            provincia: self.provincia,
            observaciones: self.observaciones,
            transporte_raw: self.transporte_raw,
            lat: self.lat,
            lng: self.lng,
            geocode_provider: self.geocode_provider,
            geocode_score: self.geocode_score,
            geocode_formatted: self.geocode_formatted,
            geocode_has_street_num: self.geocode_has_street_num,
            estado_clasificacion: Clasificacion::parse(&self.estado_clasificacion)
                .unwrap_or(Clasificacion::Pendiente),
            estado_lifecycle: Lifecycle::parse(&self.estado_lifecycle)
                .unwrap_or(Lifecycle::Ingresado),
            motivo_clasificacion: self.motivo_clasificacion,
            carrier_id: self.carrier_id,
            ventana_raw: self.ventana_raw,
            ventana_tipo: self.ventana_tipo.as_deref().and_then(VentanaTipo::parse),
            ventana_desde_min: self.ventana_desde_min,
            ventana_hasta_min: self.ventana_hasta_min,
            llamar_antes: self.llamar_antes,
            es_urgente: self.es_urgente,
            es_prioridad: self.es_prioridad,
            source: self.source,
            fecha_ingreso: self.fecha_ingreso,
            fecha_armado: self.fecha_armado,
            fecha_entregado: self.fecha_entregado,
            fecha_historico: self.fecha_historico,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
