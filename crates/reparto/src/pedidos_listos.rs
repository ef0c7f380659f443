//! Sync of externally prepared order data. Rows are upserted by order
//! number and merged into the matching remito by pipeline step 0.

use chrono::Utc;
use model::pedido_listo::PedidoListo;
use serde::{Deserialize, Serialize};

use crate::{
    error::ServiceResult,
    store::{PedidoListoRepo, RemitoRepo},
};

#[derive(Debug, Clone, Deserialize)]
pub struct PedidoListoInput {
    pub numero_remito: String,
    pub cliente: Option<String>,
    pub domicilio: Option<String>,
    pub localidad: Option<String>,
    pub provincia: Option<String>,
    pub observaciones: Option<String>,
    pub transporte: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub total: usize,
    pub nuevos: usize,
    pub actualizados: usize,
}

pub async fn sync_batch<S>(
    store: &S,
    rows: Vec<PedidoListoInput>,
) -> ServiceResult<SyncResult>
where
    S: PedidoListoRepo + RemitoRepo + Sync + ?Sized,
{
    let mut result = SyncResult {
        total: rows.len(),
        nuevos: 0,
        actualizados: 0,
    };

    for row in rows {
        let numero = row.numero_remito.trim().to_uppercase();
        if numero.is_empty() {
            continue;
        }

        let remito_id = store
            .remito_by_numero(&numero)
            .await?
            .map(|remito| remito.id);

        match store.pedido_listo_by_numero(&numero).await? {
            Some(mut existing) => {
                existing.cliente = row.cliente.or(existing.cliente);
                existing.domicilio = row.domicilio.or(existing.domicilio);
                existing.localidad = row.localidad.or(existing.localidad);
                existing.provincia = row.provincia.or(existing.provincia);
                existing.observaciones =
                    row.observaciones.or(existing.observaciones);
                existing.transporte = row.transporte.or(existing.transporte);
                existing.remito_id = remito_id.or(existing.remito_id);
                existing.synced_at = Some(Utc::now());
                store.update_pedido_listo(&existing).await?;
                result.actualizados += 1;
            }
            None => {
                let pedido = PedidoListo {
                    id: 0,
                    remito_id,
                    numero_remito: numero,
                    cliente: row.cliente,
                    domicilio: row.domicilio,
                    localidad: row.localidad,
                    provincia: row.provincia,
                    observaciones: row.observaciones,
                    transporte: row.transporte,
                    fecha_remito: None,
                    synced_at: Some(Utc::now()),
                    raw_data: None,
                    created_at: None,
                };
                store.insert_pedido_listo(&pedido).await?;
                result.nuevos += 1;
            }
        }
    }

    Ok(result)
}
