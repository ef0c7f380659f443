use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use model::historico::HistoricoEntregado;
use reparto::{entregas, store::HistoricoRepo};
use serde::Deserialize;

use crate::{
    common::{ApiResult, OkResponse},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/:id/restaurar", post(restaurar))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

async fn list(
    State(state): State<WebState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<HistoricoEntregado>> {
    let limit = params.limit.unwrap_or(100).clamp(1, 500);
    Ok(Json(state.store.list_historico(limit).await?))
}

async fn restaurar(
    State(state): State<WebState>,
    Path(id): Path<i32>,
) -> ApiResult<OkResponse> {
    entregas::restore_from_historico(state.store.as_ref(), id).await?;
    Ok(Json(OkResponse::new(format!("Histórico {id} restaurado"))))
}
