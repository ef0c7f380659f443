use serde::{Deserialize, Serialize};

pub mod billing;
pub mod cache;
pub mod carrier;
pub mod config;
pub mod historico;
pub mod pedido_listo;
pub mod remito;
pub mod ruta;

/// A WGS84 point. Longitude/latitude order follows each provider's wire
/// format at the call site; this struct is always (lat, lng).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}
