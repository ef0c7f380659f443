use model::config::ConfigEntry;
use reparto::store::Result;
use sqlx::{Executor, Postgres};

use crate::data_model::config::ConfigRow;

use super::convert_error;

pub async fn all<'c, E>(executor: E) -> Result<Vec<ConfigEntry>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, ConfigRow>(
        "SELECT key, value, tipo, descripcion, updated_at FROM config_ruta ORDER BY key",
    )
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(ConfigRow::to_model).collect())
    .map_err(convert_error)
}

pub async fn upsert<'c, E>(executor: E, entry: &ConfigEntry) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO config_ruta (key, value, tipo, descripcion)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (key) DO UPDATE SET
            value = EXCLUDED.value,
            tipo = EXCLUDED.tipo,
            descripcion = COALESCE(EXCLUDED.descripcion, config_ruta.descripcion),
            updated_at = NOW()
        ",
    )
    .bind(&entry.key)
    .bind(&entry.value)
    .bind(entry.tipo.as_str())
    .bind(&entry.descripcion)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(convert_error)
}
