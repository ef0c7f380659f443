use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal classification assigned by the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clasificacion {
    Pendiente,
    Enviar,
    Corregir,
    RetiroSospechado,
    TransporteExterno,
    NoEncontrado,
    Excluido,
}

impl Clasificacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Enviar => "enviar",
            Self::Corregir => "corregir",
            Self::RetiroSospechado => "retiro_sospechado",
            Self::TransporteExterno => "transporte_externo",
            Self::NoEncontrado => "no_encontrado",
            Self::Excluido => "excluido",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pendiente" => Some(Self::Pendiente),
            "enviar" => Some(Self::Enviar),
            "corregir" => Some(Self::Corregir),
            "retiro_sospechado" => Some(Self::RetiroSospechado),
            "transporte_externo" => Some(Self::TransporteExterno),
            "no_encontrado" => Some(Self::NoEncontrado),
            "excluido" => Some(Self::Excluido),
            _ => None,
        }
    }
}

/// Operator-controlled lifecycle. Transitions are monotonic: the variant
/// order below is the only order a remito may move through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Ingresado,
    Armado,
    Despachado,
    Entregado,
    Historico,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingresado => "ingresado",
            Self::Armado => "armado",
            Self::Despachado => "despachado",
            Self::Entregado => "entregado",
            Self::Historico => "historico",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ingresado" => Some(Self::Ingresado),
            "armado" => Some(Self::Armado),
            "despachado" => Some(Self::Despachado),
            "entregado" => Some(Self::Entregado),
            "historico" => Some(Self::Historico),
            _ => None,
        }
    }

    /// Position in the lifecycle, used by the monotonic transition guard.
    pub fn rank(&self) -> i16 {
        *self as i16
    }
}

/// Coarse time-of-day bucket assigned from a parsed delivery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VentanaTipo {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
    #[serde(rename = "SIN_HORARIO")]
    SinHorario,
}

impl VentanaTipo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
            Self::SinHorario => "SIN_HORARIO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AM" => Some(Self::Am),
            "PM" => Some(Self::Pm),
            "SIN_HORARIO" => Some(Self::SinHorario),
            _ => None,
        }
    }
}

/// A delivery order. `numero` is unique across the active set and the
/// archive, stored trimmed and uppercased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remito {
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

    pub estado_clasificacion: Clasificacion,
    pub estado_lifecycle: Lifecycle,
    pub motivo_clasificacion: Option<String>,
    pub carrier_id: Option<i32>,

    pub ventana_raw: Option<String>,
    pub ventana_tipo: Option<VentanaTipo>,
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

impl Remito {
    /// A fresh, unprocessed remito as created at ingest time. The id and
    /// the timestamps are assigned by the store on insert.
    pub fn nuevo<S: Into<String>>(numero: S, source: S) -> Self {
        Self {
            id: 0,
            numero: numero.into(),
            cliente: None,
            telefono: None,
            direccion_raw: None,
            direccion_normalizada: None,
            localidad: None,
            provincia: None,
            observaciones: None,
            transporte_raw: None,
            lat: None,
            lng: None,
            geocode_provider: None,
            geocode_score: None,
            geocode_formatted: None,
            geocode_has_street_num: None,
            estado_clasificacion: Clasificacion::Pendiente,
            estado_lifecycle: Lifecycle::Ingresado,
            motivo_clasificacion: None,
            carrier_id: None,
            ventana_raw: None,
            ventana_tipo: None,
            ventana_desde_min: None,
            ventana_hasta_min: None,
            llamar_antes: false,
            es_urgente: false,
            es_prioridad: false,
            source: Some(source.into()),
            fecha_ingreso: None,
            fecha_armado: None,
            fecha_entregado: None,
            fecha_historico: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn coordinate(&self) -> Option<crate::Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(crate::Coordinate::new(lat, lng)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_order_is_monotonic() {
        assert!(Lifecycle::Ingresado < Lifecycle::Armado);
        assert!(Lifecycle::Armado < Lifecycle::Despachado);
        assert!(Lifecycle::Despachado < Lifecycle::Entregado);
        assert!(Lifecycle::Entregado < Lifecycle::Historico);
    }

    #[test]
    fn clasificacion_round_trips_db_strings() {
        for c in [
            Clasificacion::Pendiente,
            Clasificacion::Enviar,
            Clasificacion::Corregir,
            Clasificacion::RetiroSospechado,
            Clasificacion::TransporteExterno,
            Clasificacion::NoEncontrado,
            Clasificacion::Excluido,
        ] {
            assert_eq!(Clasificacion::parse(c.as_str()), Some(c));
        }
    }

    #[test]
    fn ventana_tipo_uses_upper_case_db_strings() {
        assert_eq!(VentanaTipo::Am.as_str(), "AM");
        assert_eq!(VentanaTipo::parse("SIN_HORARIO"), Some(VentanaTipo::SinHorario));
        assert_eq!(VentanaTipo::parse("am"), None);
    }
}
