use model::historico::HistoricoEntregado;
use reparto::store::{Result, StoreError};
use sqlx::{Executor, Postgres};

use crate::data_model::historico::HistoricoRow;

use super::convert_error;

const COLUMNS: &str = "\
    id, remito_id, numero, cliente, direccion_snapshot, localidad, provincia, \
    observaciones, lat, lng, carrier_nombre, es_urgente, es_prioridad, \
    obs_entrega, estado_al_archivar, fecha_ingreso, fecha_armado, \
    fecha_entregado, fecha_archivado, mes_cierre";

pub async fn by_id<'c, E>(
    executor: E,
    id: i32,
) -> Result<Option<HistoricoEntregado>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, HistoricoRow>(&format!(
        "SELECT {COLUMNS} FROM historico_entregados WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(HistoricoRow::to_model))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(
    executor: E,
    row: &HistoricoEntregado,
) -> Result<HistoricoEntregado>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, HistoricoRow>(&format!(
        "
        INSERT INTO historico_entregados (
            remito_id, numero, cliente, direccion_snapshot, localidad,
            provincia, observaciones, lat, lng, carrier_nombre, es_urgente,
            es_prioridad, obs_entrega, estado_al_archivar, fecha_ingreso,
            fecha_armado, fecha_entregado, mes_cierre
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18)
        RETURNING {COLUMNS}
        "
    ))
    .bind(row.remito_id)
    .bind(&row.numero)
    .bind(&row.cliente)
    .bind(&row.direccion_snapshot)
    .bind(&row.localidad)
    .bind(&row.provincia)
    .bind(&row.observaciones)
    .bind(row.lat)
    .bind(row.lng)
    .bind(&row.carrier_nombre)
    .bind(row.es_urgente)
    .bind(row.es_prioridad)
    .bind(&row.obs_entrega)
    .bind(&row.estado_al_archivar)
    .bind(row.fecha_ingreso)
    .bind(row.fecha_armado)
    .bind(row.fecha_entregado)
    .bind(&row.mes_cierre)
    .fetch_one(executor)
    .await
    .map(HistoricoRow::to_model)
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, id: i32) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM historico_entregados WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub async fn list<'c, E>(
    executor: E,
    limit: i64,
) -> Result<Vec<HistoricoEntregado>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, HistoricoRow>(&format!(
        "SELECT {COLUMNS} FROM historico_entregados ORDER BY id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(HistoricoRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn numero_exists<'c, E>(executor: E, numero: &str) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM historico_entregados WHERE numero = $1)",
    )
    .bind(numero)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}
