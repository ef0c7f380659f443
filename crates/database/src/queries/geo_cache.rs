use chrono::{DateTime, Utc};
use model::cache::GeoCacheEntry;
use reparto::store::Result;
use sqlx::{Executor, Postgres};

use crate::data_model::cache::GeoCacheRow;

use super::convert_error;

const COLUMNS: &str = "\
    id, key_normalizada, query_original, lat, lng, formatted_address, \
    has_street_number, provider, score, created_at, expires_at";

pub async fn lookup<'c, E>(
    executor: E,
    key: &str,
    now: DateTime<Utc>,
) -> Result<Option<GeoCacheEntry>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, GeoCacheRow>(&format!(
        "
        SELECT {COLUMNS} FROM geo_cache
        WHERE key_normalizada = $1
          AND (expires_at IS NULL OR expires_at > $2)
        "
    ))
    .bind(key)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(GeoCacheRow::to_model))
    .map_err(convert_error)
}

/// Compaction: drops expired rows, returns how many went away.
pub async fn purge_expired<'c, E>(executor: E, now: DateTime<Utc>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "DELETE FROM geo_cache WHERE expires_at IS NOT NULL AND expires_at <= $1",
    )
    .bind(now)
    .execute(executor)
    .await
    .map(|result| result.rows_affected())
    .map_err(convert_error)
}

pub async fn store<'c, E>(executor: E, entry: &GeoCacheEntry) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO geo_cache (
            key_normalizada, query_original, lat, lng, formatted_address,
            has_street_number, provider, score, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (key_normalizada) DO UPDATE SET
            query_original = EXCLUDED.query_original,
            lat = EXCLUDED.lat,
            lng = EXCLUDED.lng,
            formatted_address = EXCLUDED.formatted_address,
            has_street_number = EXCLUDED.has_street_number,
            provider = EXCLUDED.provider,
            score = EXCLUDED.score,
            created_at = NOW(),
            expires_at = EXCLUDED.expires_at
        ",
    )
    .bind(&entry.key_normalizada)
    .bind(&entry.query_original)
    .bind(entry.lat)
    .bind(entry.lng)
    .bind(&entry.formatted_address)
    .bind(entry.has_street_number)
    .bind(&entry.provider)
    .bind(entry.score)
    .bind(entry.expires_at)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(convert_error)
}
