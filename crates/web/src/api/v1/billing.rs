use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use model::billing::BillingTrace;
use reparto::store::BillingRepo;
use serde::Deserialize;

use crate::{common::ApiResult, WebState};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new().route("/", get(list)).with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    run_id: Option<String>,
    limit: Option<i64>,
}

async fn list(
    State(state): State<WebState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<BillingTrace>> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    Ok(Json(
        state
            .store
            .list_billing(params.run_id.as_deref(), limit)
            .await?,
    ))
}
