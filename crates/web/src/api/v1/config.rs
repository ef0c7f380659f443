use axum::{extract::State, routing::get, Json, Router};
use model::config::{ConfigEntry, ConfigTipo, RouteConfig, CONFIG_KEYS};
use reparto::store::ConfigRepo;
use serde::{Deserialize, Serialize};

use crate::{
    common::{ApiError, ApiResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(list).put(update))
        .route("/effective", get(effective))
        .with_state(state)
}

async fn list(State(state): State<WebState>) -> ApiResult<Vec<ConfigEntry>> {
    Ok(Json(state.store.config_entries().await?))
}

/// The typed view the route builder will actually use, defaults applied.
async fn effective(State(state): State<WebState>) -> ApiResult<RouteConfig> {
    let entries = state.store.config_entries().await?;
    Ok(Json(RouteConfig::from_entries(&entries)))
}

#[derive(Debug, Deserialize)]
struct ConfigUpdate {
    key: String,
    value: String,
    tipo: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConfigUpdated {
    key: String,
    value: String,
}

async fn update(
    State(state): State<WebState>,
    Json(body): Json<ConfigUpdate>,
) -> ApiResult<ConfigUpdated> {
    if !CONFIG_KEYS.contains(&body.key.as_str()) {
        return Err(ApiError::bad_request(format!(
            "clave de configuración desconocida: {}",
            body.key
        )));
    }
    let tipo = match &body.tipo {
        Some(raw) => ConfigTipo::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!("tipo desconocido: {raw}"))
        })?,
        None => ConfigTipo::Str,
    };

    let entry = ConfigEntry {
        key: body.key.clone(),
        value: body.value.clone(),
        tipo,
        descripcion: None,
        updated_at: None,
    };
    state.store.upsert_config(&entry).await?;
    Ok(Json(ConfigUpdated {
        key: body.key,
        value: body.value,
    }))
}
