use model::billing::BillingTrace;
use reparto::store::Result;
use sqlx::{Executor, Postgres};

use crate::data_model::billing::BillingTraceRow;

use super::convert_error;

const COLUMNS: &str = "\
    id, run_id, stage, service, sku, units, response_code, latency_ms, \
    estimated_cost, created_at";

pub async fn append<'c, E>(executor: E, trace: &BillingTrace) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO billing_traces (
            run_id, stage, service, sku, units, response_code, latency_ms,
            estimated_cost
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(&trace.run_id)
    .bind(&trace.stage)
    .bind(&trace.service)
    .bind(&trace.sku)
    .bind(trace.units)
    .bind(trace.response_code)
    .bind(trace.latency_ms)
    .bind(trace.estimated_cost)
    .execute(executor)
    .await
    .map(|_| ())
    .map_err(convert_error)
}

pub async fn list<'c, E>(
    executor: E,
    run_id: Option<&str>,
    limit: i64,
) -> Result<Vec<BillingTrace>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, BillingTraceRow>(&format!(
        "
        SELECT {COLUMNS} FROM billing_traces
        WHERE ($1::text IS NULL OR run_id = $1)
        ORDER BY id DESC
        LIMIT $2
        "
    ))
    .bind(run_id)
    .bind(limit)
    .fetch_all(executor)
    .await
    .map(|rows| rows.into_iter().map(BillingTraceRow::to_model).collect())
    .map_err(convert_error)
}
