use model::remito::Remito;
use reparto::store::{RemitoFilter, Result};
use sqlx::{Executor, Postgres};

use crate::data_model::remito::RemitoRow;

use super::convert_error;

const COLUMNS: &str = "\
    id, numero, cliente, telefono, direccion_raw, direccion_normalizada, \
    localidad, provincia, observaciones, transporte_raw, lat, lng, \
    geocode_provider, geocode_score, geocode_formatted, geocode_has_street_num, \
    estado_clasificacion, estado_lifecycle, motivo_clasificacion, carrier_id, \
    ventana_raw, ventana_tipo, ventana_desde_min, ventana_hasta_min, \
    llamar_antes, es_urgente, es_prioridad, source, fecha_ingreso, \
    fecha_armado, fecha_entregado, fecha_historico, created_at, updated_at";

pub async fn by_id<'c, E>(executor: E, id: i32) -> Result<Option<Remito>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RemitoRow>(&format!(
        "SELECT {COLUMNS} FROM remitos WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(RemitoRow::to_model))
    .map_err(convert_error)
}

pub async fn by_numero<'c, E>(executor: E, numero: &str) -> Result<Option<Remito>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RemitoRow>(&format!(
        "SELECT {COLUMNS} FROM remitos WHERE numero = $1"
    ))
    .bind(numero)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(RemitoRow::to_model))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, remito: &Remito) -> Result<Remito>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RemitoRow>(&format!(
        "
        INSERT INTO remitos (
            numero, cliente, telefono, direccion_raw, direccion_normalizada,
            localidad, provincia, observaciones, transporte_raw,
            estado_clasificacion, estado_lifecycle, motivo_clasificacion,
            carrier_id, es_urgente, es_prioridad, source
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16)
        RETURNING {COLUMNS}
        "
    ))
    .bind(&remito.numero)
    .bind(&remito.cliente)
    .bind(&remito.telefono)
    .bind(&remito.direccion_raw)
    .bind(&remito.direccion_normalizada)
    .bind(&remito.localidad)
    .bind(&remito.provincia)
    .bind(&remito.observaciones)
    .bind(&remito.transporte_raw)
    .bind(remito.estado_clasificacion.as_str())
    .bind(remito.estado_lifecycle.as_str())
    .bind(&remito.motivo_clasificacion)
    .bind(remito.carrier_id)
    .bind(remito.es_urgente)
    .bind(remito.es_prioridad)
    .bind(&remito.source)
    .fetch_one(executor)
    .await
    .map(RemitoRow::to_model)
    .map_err(convert_error)
}

fn update_sql(guarded: bool) -> String {
    let guard = if guarded {
        " AND updated_at IS NOT DISTINCT FROM $30"
    } else {
        ""
    };
    format!(
        "
        UPDATE remitos SET
            cliente = $2, telefono = $3, direccion_raw = $4,
            direccion_normalizada = $5, localidad = $6, provincia = $7,
            observaciones = $8, transporte_raw = $9, lat = $10, lng = $11,
            geocode_provider = $12, geocode_score = $13,
            geocode_formatted = $14, geocode_has_street_num = $15,
            estado_clasificacion = $16, estado_lifecycle = $17,
            motivo_clasificacion = $18, carrier_id = $19, ventana_raw = $20,
            ventana_tipo = $21, ventana_desde_min = $22,
            ventana_hasta_min = $23, llamar_antes = $24, es_urgente = $25,
            es_prioridad = $26, fecha_armado = $27, fecha_entregado = $28,
            fecha_historico = $29, updated_at = NOW()
        WHERE id = $1{guard}
        RETURNING {COLUMNS}
        "
    )
}

fn bind_update<'q>(
    query: sqlx::query::QueryAs<'q, Postgres, RemitoRow, sqlx::postgres::PgArguments>,
    remito: &'q Remito,
) -> sqlx::query::QueryAs<'q, Postgres, RemitoRow, sqlx::postgres::PgArguments> {
    query
        .bind(remito.id)
        .bind(&remito.cliente)
        .bind(&remito.telefono)
        .bind(&remito.direccion_raw)
        .bind(&remito.direccion_normalizada)
        .bind(&remito.localidad)
        .bind(&remito.provincia)
        .bind(&remito.observaciones)
        .bind(&remito.transporte_raw)
        .bind(remito.lat)
        .bind(remito.lng)
        .bind(&remito.geocode_provider)
        .bind(remito.geocode_score)
        .bind(&remito.geocode_formatted)
        .bind(remito.geocode_has_street_num)
        .bind(remito.estado_clasificacion.as_str())
        .bind(remito.estado_lifecycle.as_str())
        .bind(&remito.motivo_clasificacion)
        .bind(remito.carrier_id)
        .bind(&remito.ventana_raw)
        .bind(remito.ventana_tipo.map(|tipo| tipo.as_str()))
        .bind(remito.ventana_desde_min)
        .bind(remito.ventana_hasta_min)
        .bind(remito.llamar_antes)
        .bind(remito.es_urgente)
        .bind(remito.es_prioridad)
        .bind(remito.fecha_armado)
        .bind(remito.fecha_entregado)
        .bind(remito.fecha_historico)
}

pub async fn update<'c, E>(executor: E, remito: &Remito) -> Result<Remito>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = update_sql(false);
    bind_update(sqlx::query_as::<_, RemitoRow>(&sql), remito)
        .fetch_one(executor)
        .await
        .map(RemitoRow::to_model)
        .map_err(convert_error)
}

/// Optimistic update: no row comes back when someone else committed in
/// between and the caller has to retry with refreshed state.
pub async fn update_guarded<'c, E>(
    executor: E,
    remito: &Remito,
) -> Result<Option<Remito>>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = update_sql(true);
    bind_update(sqlx::query_as::<_, RemitoRow>(&sql), remito)
        .bind(remito.updated_at)
        .fetch_optional(executor)
        .await
        .map(|row| row.map(RemitoRow::to_model))
        .map_err(convert_error)
}

pub async fn delete<'c, E>(executor: E, id: i32) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM remitos WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(reparto::store::StoreError::NotFound);
    }
    Ok(())
}

pub async fn pendientes<'c, E>(executor: E) -> Result<Vec<Remito>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RemitoRow>(&format!(
        "
        SELECT {COLUMNS} FROM remitos
        WHERE estado_clasificacion = 'pendiente'
        ORDER BY created_at
        "
    ))
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(RemitoRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn candidatos_ruta<'c, E>(executor: E) -> Result<Vec<Remito>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, RemitoRow>(&format!(
        "
        SELECT {COLUMNS} FROM remitos
        WHERE estado_clasificacion = 'enviar'
          AND estado_lifecycle = 'armado'
          AND lat IS NOT NULL
          AND lng IS NOT NULL
        ORDER BY id
        "
    ))
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(RemitoRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn list<'c, E>(
    executor: E,
    filter: &RemitoFilter,
) -> Result<Vec<Remito>>
where
    E: Executor<'c, Database = Postgres>,
{
    let size = filter.size.max(1) as i64;
    let offset = (filter.page.max(1) as i64 - 1) * size;
    sqlx::query_as::<_, RemitoRow>(&format!(
        "
        SELECT {COLUMNS} FROM remitos
        WHERE ($1::text IS NULL OR estado_clasificacion = $1)
          AND ($2::text IS NULL OR estado_lifecycle = $2)
          AND ($3::text IS NULL
               OR numero ILIKE '%' || $3 || '%'
               OR cliente ILIKE '%' || $3 || '%')
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "
    ))
    .bind(filter.clasificacion.map(|c| c.as_str()))
    .bind(filter.lifecycle.map(|l| l.as_str()))
    .bind(&filter.query)
    .bind(size)
    .bind(offset)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(RemitoRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn count<'c, E>(executor: E, filter: &RemitoFilter) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar::<_, i64>(
        "
        SELECT COUNT(*) FROM remitos
        WHERE ($1::text IS NULL OR estado_clasificacion = $1)
          AND ($2::text IS NULL OR estado_lifecycle = $2)
          AND ($3::text IS NULL
               OR numero ILIKE '%' || $3 || '%'
               OR cliente ILIKE '%' || $3 || '%')
        ",
    )
    .bind(filter.clasificacion.map(|c| c.as_str()))
    .bind(filter.lifecycle.map(|l| l.as_str()))
    .bind(&filter.query)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}
