use model::pedido_listo::PedidoListo;
use reparto::store::Result;
use sqlx::{types::Json, Executor, Postgres};

use crate::data_model::pedido_listo::PedidoListoRow;

use super::convert_error;

const COLUMNS: &str = "\
    id, remito_id, numero_remito, cliente, domicilio, localidad, provincia, \
    observaciones, transporte, fecha_remito, synced_at, raw_data, created_at";

pub async fn by_numero<'c, E>(
    executor: E,
    numero: &str,
) -> Result<Option<PedidoListo>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, PedidoListoRow>(&format!(
        "SELECT {COLUMNS} FROM pedidos_listos WHERE numero_remito = $1"
    ))
    .bind(numero)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(PedidoListoRow::to_model))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, pedido: &PedidoListo) -> Result<PedidoListo>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, PedidoListoRow>(&format!(
        "
        INSERT INTO pedidos_listos (
            remito_id, numero_remito, cliente, domicilio, localidad,
            provincia, observaciones, transporte, fecha_remito, raw_data
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS}
        "
    ))
    .bind(pedido.remito_id)
    .bind(&pedido.numero_remito)
    .bind(&pedido.cliente)
    .bind(&pedido.domicilio)
    .bind(&pedido.localidad)
    .bind(&pedido.provincia)
    .bind(&pedido.observaciones)
    .bind(&pedido.transporte)
    .bind(pedido.fecha_remito)
    .bind(pedido.raw_data.as_ref().map(Json))
    .fetch_one(executor)
    .await
    .map(PedidoListoRow::to_model)
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, pedido: &PedidoListo) -> Result<PedidoListo>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, PedidoListoRow>(&format!(
        "
        UPDATE pedidos_listos SET
            remito_id = $2, cliente = $3, domicilio = $4, localidad = $5,
            provincia = $6, observaciones = $7, transporte = $8,
            fecha_remito = $9, raw_data = $10, synced_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "
    ))
    .bind(pedido.id)
    .bind(pedido.remito_id)
    .bind(&pedido.cliente)
    .bind(&pedido.domicilio)
    .bind(&pedido.localidad)
    .bind(&pedido.provincia)
    .bind(&pedido.observaciones)
    .bind(&pedido.transporte)
    .bind(pedido.fecha_remito)
    .bind(pedido.raw_data.as_ref().map(Json))
    .fetch_one(executor)
    .await
    .map(PedidoListoRow::to_model)
    .map_err(convert_error)
}
