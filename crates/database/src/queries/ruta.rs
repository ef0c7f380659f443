use model::ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada};
use reparto::store::{Result, StoreError};
use sqlx::{types::Json, Executor, Postgres};

use crate::data_model::ruta::{RutaExcluidoRow, RutaParadaRow, RutaRow};

use super::convert_error;

const RUTA_COLUMNS: &str = "\
    id, fecha, estado, total_paradas, total_excluidos, duracion_estimada_min, \
    distancia_total_km, gmaps_links, ruta_geom, config_snapshot, \
    api_cost_estimate, deposito_lat, deposito_lng, created_at, completed_at, \
    updated_at";

const PARADA_COLUMNS: &str = "\
    id, ruta_id, remito_id, remito_numero, orden, lat_snapshot, lng_snapshot, \
    cliente_snapshot, direccion_snapshot, observaciones_snapshot, \
    minutos_desde_anterior, tiempo_espera_min, minutos_acumulados, \
    distancia_desde_anterior_km, es_urgente, es_prioridad, ventana_tipo, \
    estado, created_at, updated_at";

const EXCLUIDO_COLUMNS: &str = "\
    id, ruta_id, remito_id, remito_numero, cliente_snapshot, \
    direccion_snapshot, motivo, distancia_km, observaciones_snapshot, \
    created_at";

pub async fn insert<'c, E>(executor: E, ruta: &Ruta) -> Result<Ruta>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaRow>(&format!(
        "
        INSERT INTO rutas (
            fecha, estado, total_paradas, total_excluidos,
            duracion_estimada_min, distancia_total_km, gmaps_links, ruta_geom,
            config_snapshot, api_cost_estimate, deposito_lat, deposito_lng
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {RUTA_COLUMNS}
        "
    ))
    .bind(ruta.fecha)
    .bind(ruta.estado.as_str())
    .bind(ruta.total_paradas)
    .bind(ruta.total_excluidos)
    .bind(ruta.duracion_estimada_min)
    .bind(ruta.distancia_total_km)
    .bind(Json(&ruta.gmaps_links))
    .bind(ruta.ruta_linea.as_ref().map(Json))
    .bind(Json(&ruta.config_snapshot))
    .bind(ruta.api_cost_estimate)
    .bind(ruta.deposito_lat)
    .bind(ruta.deposito_lng)
    .fetch_one(executor)
    .await
    .map(RutaRow::to_model)
    .map_err(convert_error)
}

pub async fn insert_parada<'c, E>(
    executor: E,
    ruta_id: i32,
    parada: &RutaParada,
) -> Result<RutaParada>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaParadaRow>(&format!(
        "
        INSERT INTO ruta_paradas (
            ruta_id, remito_id, remito_numero, orden, lat_snapshot,
            lng_snapshot, cliente_snapshot, direccion_snapshot,
            observaciones_snapshot, minutos_desde_anterior, tiempo_espera_min,
            minutos_acumulados, distancia_desde_anterior_km, es_urgente,
            es_prioridad, ventana_tipo, estado
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17)
        RETURNING {PARADA_COLUMNS}
        "
    ))
    .bind(ruta_id)
    .bind(parada.remito_id)
    .bind(&parada.remito_numero)
    .bind(parada.orden)
    .bind(parada.lat_snapshot)
    .bind(parada.lng_snapshot)
    .bind(&parada.cliente_snapshot)
    .bind(&parada.direccion_snapshot)
    .bind(&parada.observaciones_snapshot)
    .bind(parada.minutos_desde_anterior)
    .bind(parada.tiempo_espera_min)
    .bind(parada.minutos_acumulados)
    .bind(parada.distancia_desde_anterior_km)
    .bind(parada.es_urgente)
    .bind(parada.es_prioridad)
    .bind(parada.ventana_tipo.map(|tipo| tipo.as_str()))
    .bind(parada.estado.as_str())
    .fetch_one(executor)
    .await
    .map(RutaParadaRow::to_model)
    .map_err(convert_error)
}

pub async fn insert_excluido<'c, E>(
    executor: E,
    excluido: &RutaExcluido,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO ruta_excluidos (
            ruta_id, remito_id, remito_numero, cliente_snapshot,
            direccion_snapshot, motivo, distancia_km, observaciones_snapshot
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(excluido.ruta_id)
    .bind(excluido.remito_id)
    .bind(&excluido.remito_numero)
    .bind(&excluido.cliente_snapshot)
    .bind(&excluido.direccion_snapshot)
    .bind(&excluido.motivo)
    .bind(excluido.distancia_km)
    .bind(&excluido.observaciones_snapshot)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(convert_error)
}

pub async fn by_id<'c, E>(executor: E, id: i32) -> Result<Option<Ruta>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaRow>(&format!(
        "SELECT {RUTA_COLUMNS} FROM rutas WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(RutaRow::to_model))
    .map_err(convert_error)
}

pub async fn latest<'c, E>(executor: E) -> Result<Option<Ruta>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaRow>(&format!(
        "SELECT {RUTA_COLUMNS} FROM rutas ORDER BY id DESC LIMIT 1"
    ))
    .fetch_optional(executor)
    .await
    .map(|row| row.map(RutaRow::to_model))
    .map_err(convert_error)
}

pub async fn list<'c, E>(executor: E, limit: i64) -> Result<Vec<Ruta>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaRow>(&format!(
        "SELECT {RUTA_COLUMNS} FROM rutas ORDER BY fecha DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(RutaRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, id: i32) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM rutas WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub async fn paradas<'c, E>(executor: E, ruta_id: i32) -> Result<Vec<RutaParada>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaParadaRow>(&format!(
        "SELECT {PARADA_COLUMNS} FROM ruta_paradas WHERE ruta_id = $1 ORDER BY orden"
    ))
    .bind(ruta_id)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(RutaParadaRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn excluidos<'c, E>(
    executor: E,
    ruta_id: i32,
) -> Result<Vec<RutaExcluido>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaExcluidoRow>(&format!(
        "SELECT {EXCLUIDO_COLUMNS} FROM ruta_excluidos WHERE ruta_id = $1 ORDER BY id"
    ))
    .bind(ruta_id)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(RutaExcluidoRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn set_estado<'c, E>(
    executor: E,
    ruta_id: i32,
    estado: RutaEstado,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        UPDATE rutas SET
            estado = $2,
            completed_at = CASE WHEN $2 = 'completada' THEN NOW()
                                ELSE completed_at END,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(ruta_id)
    .bind(estado.as_str())
    .execute(executor)
    .await
    .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub async fn set_parada_estado<'c, E>(
    executor: E,
    ruta_id: i32,
    parada_id: i32,
    estado: ParadaEstado,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query(
        "
        UPDATE ruta_paradas SET estado = $3, updated_at = NOW()
        WHERE id = $2 AND ruta_id = $1
        ",
    )
    .bind(ruta_id)
    .bind(parada_id)
    .bind(estado.as_str())
    .execute(executor)
    .await
    .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub async fn parada_pendiente_de_remito<'c, E>(
    executor: E,
    remito_id: i32,
) -> Result<Option<RutaParada>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RutaParadaRow>(&format!(
        "
        SELECT {PARADA_COLUMNS} FROM ruta_paradas
        WHERE remito_id = $1 AND estado = 'pendiente'
        ORDER BY id DESC
        LIMIT 1
        "
    ))
    .bind(remito_id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(RutaParadaRow::to_model))
    .map_err(convert_error)
}
