use axum::{extract::State, routing::post, Json, Router};
use reparto::pedidos_listos::{self, PedidoListoInput, SyncResult};

use crate::{common::ApiResult, WebState};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new().route("/sync", post(sync)).with_state(state)
}

async fn sync(
    State(state): State<WebState>,
    Json(rows): Json<Vec<PedidoListoInput>>,
) -> ApiResult<SyncResult> {
    Ok(Json(
        pedidos_listos::sync_batch(state.store.as_ref(), rows).await?,
    ))
}
