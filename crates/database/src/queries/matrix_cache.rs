use chrono::{DateTime, Utc};
use model::{cache::MatrixCacheEntry, Coordinate};
use reparto::store::Result;
use sqlx::{Executor, Postgres};

use super::convert_error;

/// Tolerance lookup over the composite coordinate index. Any provider's
/// row within the window satisfies a read.
pub async fn lookup<'c, E>(
    executor: E,
    origin: Coordinate,
    dest: Coordinate,
    tolerance_deg: f64,
    now: DateTime<Utc>,
) -> Result<Option<f64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar::<_, f64>(
        "
        SELECT duration_sec FROM distance_matrix_cache
        WHERE origin_lat BETWEEN $1 - $5 AND $1 + $5
          AND origin_lng BETWEEN $2 - $5 AND $2 + $5
          AND dest_lat BETWEEN $3 - $5 AND $3 + $5
          AND dest_lng BETWEEN $4 - $5 AND $4 + $5
          AND expires_at > $6
        LIMIT 1
        ",
    )
    .bind(origin.lat)
    .bind(origin.lng)
    .bind(dest.lat)
    .bind(dest.lng)
    .bind(tolerance_deg)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

pub async fn store<'c, E>(executor: E, entry: &MatrixCacheEntry) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO distance_matrix_cache (
            origin_lat, origin_lng, dest_lat, dest_lng, duration_sec,
            distance_m, provider, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(entry.origin_lat)
    .bind(entry.origin_lng)
    .bind(entry.dest_lat)
    .bind(entry.dest_lng)
    .bind(entry.duration_sec)
    .bind(entry.distance_m)
    .bind(&entry.provider)
    .bind(entry.expires_at)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(convert_error)
}

/// Compaction: drops expired rows, returns how many went away.
pub async fn purge_expired<'c, E>(executor: E, now: DateTime<Utc>) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM distance_matrix_cache WHERE expires_at <= $1")
        .bind(now)
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(convert_error)
}
