use model::carrier::Carrier;
use reparto::store::Result;
use sqlx::{types::Json, Executor, Postgres};

use crate::data_model::carrier::CarrierRow;

use super::convert_error;

const COLUMNS: &str = "\
    id, nombre_canonico, aliases, regex_pattern, es_externo, es_pickup, \
    activo, prioridad_regex, created_at, updated_at";

pub async fn by_id<'c, E>(executor: E, id: i32) -> Result<Option<Carrier>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CarrierRow>(&format!(
        "SELECT {COLUMNS} FROM carriers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(CarrierRow::to_model))
    .map_err(convert_error)
}

pub async fn by_nombre<'c, E>(
    executor: E,
    nombre: &str,
) -> Result<Option<Carrier>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CarrierRow>(&format!(
        "SELECT {COLUMNS} FROM carriers WHERE nombre_canonico = $1"
    ))
    .bind(nombre)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(CarrierRow::to_model))
    .map_err(convert_error)
}

pub async fn activos<'c, E>(executor: E) -> Result<Vec<Carrier>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CarrierRow>(&format!(
        "
        SELECT {COLUMNS} FROM carriers
        WHERE activo = TRUE
        ORDER BY prioridad_regex, nombre_canonico
        "
    ))
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(CarrierRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn all<'c, E>(executor: E) -> Result<Vec<Carrier>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CarrierRow>(&format!(
        "SELECT {COLUMNS} FROM carriers ORDER BY nombre_canonico"
    ))
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(CarrierRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, carrier: &Carrier) -> Result<Carrier>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CarrierRow>(&format!(
        "
        INSERT INTO carriers (
            nombre_canonico, aliases, regex_pattern, es_externo, es_pickup,
            activo, prioridad_regex
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "
    ))
    .bind(&carrier.nombre_canonico)
    .bind(Json(&carrier.aliases))
    .bind(&carrier.regex_pattern)
    .bind(carrier.es_externo)
    .bind(carrier.es_pickup)
    .bind(carrier.activo)
    .bind(carrier.prioridad_regex)
    .fetch_one(executor)
    .await
    .map(CarrierRow::to_model)
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, carrier: &Carrier) -> Result<Carrier>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, CarrierRow>(&format!(
        "
        UPDATE carriers SET
            nombre_canonico = $2, aliases = $3, regex_pattern = $4,
            es_externo = $5, es_pickup = $6, activo = $7,
            prioridad_regex = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING {COLUMNS}
        "
    ))
    .bind(carrier.id)
    .bind(&carrier.nombre_canonico)
    .bind(Json(&carrier.aliases))
    .bind(&carrier.regex_pattern)
    .bind(carrier.es_externo)
    .bind(carrier.es_pickup)
    .bind(carrier.activo)
    .bind(carrier.prioridad_regex)
    .fetch_one(executor)
    .await
    .map(CarrierRow::to_model)
    .map_err(convert_error)
}
