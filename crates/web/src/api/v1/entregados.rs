use axum::{extract::State, routing::post, Json, Router};
use reparto::entregas;
use serde::{Deserialize, Serialize};

use crate::{common::ApiResult, WebState};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/marcar", post(marcar))
        .route("/archivar", post(archivar))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IdsBody {
    ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: usize,
}

async fn marcar(
    State(state): State<WebState>,
    Json(body): Json<IdsBody>,
) -> ApiResult<CountResponse> {
    let count = entregas::mark_entregado(state.store.as_ref(), &body.ids).await?;
    Ok(Json(CountResponse { count }))
}

async fn archivar(
    State(state): State<WebState>,
    Json(body): Json<IdsBody>,
) -> ApiResult<CountResponse> {
    let count =
        entregas::move_to_historico(state.store.as_ref(), &body.ids).await?;
    Ok(Json(CountResponse { count }))
}
