use chrono::{DateTime, NaiveDate, Utc};
use model::pedido_listo::PedidoListo;
use sqlx::{prelude::FromRow, types::Json};

#[derive(Debug, Clone, FromRow)]
pub struct PedidoListoRow {
    pub id: i32,
    pub remito_id: Option<i32>,
    pub numero_remito: String,
    pub cliente: Option<String>,
    pub domicilio: Option<String>,
    pub localidad: Option<String>,
    pub provincia: Option<String>,
    pub observaciones: Option<String>,
    pub transporte: Option<String>,
    pub fecha_remito: Option<NaiveDate>,
    pub synced_at: Option<DateTime<Utc>>,
    pub raw_data: Option<Json<serde_json::Value>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PedidoListoRow {
    pub fn to_model(self) -> PedidoListo {
        PedidoListo {
            id: self.id,
            remito_id: self.remito_id,
            numero_remito: self.numero_remito,
            cliente: self.cliente,
            domicilio: self.domicilio,
            localidad: self.localidad,
            provincia: self.provincia,
            observaciones: self.observaciones,
            transporte: self.transporte,
            fecha_remito: self.fecha_remito,
            synced_at: self.synced_at,
            raw_data: self.raw_data.map(|data| data.0),
            created_at: self.created_at,
        }
    }
}
