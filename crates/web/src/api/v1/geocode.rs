use axum::{extract::State, routing::post, Json, Router};
use model::config::RouteConfig;
use reparto::{direccion, geocode::GeocodeResult, new_run_id, store::ConfigRepo};
use serde::{Deserialize, Serialize};

use crate::{common::ApiResult, WebState};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/preview", post(preview))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PreviewBody {
    direccion: String,
}

#[derive(Debug, Serialize)]
struct PreviewResponse {
    normalizada: String,
    cache_key: String,
    calle_base: String,
    resultado: Option<GeocodeResult>,
}

/// Operator dry-run: shows what the pipeline would do with an address.
async fn preview(
    State(state): State<WebState>,
    Json(body): Json<PreviewBody>,
) -> ApiResult<PreviewResponse> {
    let entries = state.store.config_entries().await?;
    let config = RouteConfig::from_entries(&entries);
    let resultado = state
        .geocoder
        .lookup(
            state.store.as_ref(),
            &body.direccion,
            config.geocode_cache_days,
            &new_run_id(),
            "preview",
        )
        .await;

    Ok(Json(PreviewResponse {
        normalizada: direccion::normalize(&body.direccion),
        cache_key: direccion::normalize_key(&body.direccion),
        calle_base: direccion::extract_street_base(&body.direccion),
        resultado,
    }))
}
