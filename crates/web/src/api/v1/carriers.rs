use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use model::carrier::Carrier;
use reparto::store::CarrierRepo;
use serde::Deserialize;

use crate::{
    common::{ApiError, ApiResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update))
        .with_state(state)
}

async fn list(State(state): State<WebState>) -> ApiResult<Vec<Carrier>> {
    Ok(Json(state.store.list_carriers().await?))
}

#[derive(Debug, Deserialize)]
struct CarrierBody {
    nombre_canonico: String,
    aliases: Option<Vec<String>>,
    regex_pattern: Option<String>,
    es_externo: Option<bool>,
    es_pickup: Option<bool>,
    activo: Option<bool>,
    prioridad_regex: Option<i32>,
}

async fn create(
    State(state): State<WebState>,
    Json(body): Json<CarrierBody>,
) -> ApiResult<Carrier> {
    let carrier = Carrier {
        id: 0,
        nombre_canonico: body.nombre_canonico.trim().to_uppercase(),
        aliases: body.aliases.unwrap_or_default(),
        regex_pattern: body.regex_pattern,
        es_externo: body.es_externo.unwrap_or(true),
        es_pickup: body.es_pickup.unwrap_or(false),
        activo: body.activo.unwrap_or(true),
        prioridad_regex: body.prioridad_regex.unwrap_or(50),
        created_at: None,
        updated_at: None,
    };
    Ok(Json(state.store.insert_carrier(&carrier).await?))
}

async fn update(
    State(state): State<WebState>,
    Path(id): Path<i32>,
    Json(body): Json<CarrierBody>,
) -> ApiResult<Carrier> {
    let mut carrier = state
        .store
        .carrier_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Carrier"))?;

    carrier.nombre_canonico = body.nombre_canonico.trim().to_uppercase();
    if let Some(aliases) = body.aliases {
        carrier.aliases = aliases;
    }
    if body.regex_pattern.is_some() {
        carrier.regex_pattern = body.regex_pattern;
    }
    if let Some(es_externo) = body.es_externo {
        carrier.es_externo = es_externo;
    }
    if let Some(es_pickup) = body.es_pickup {
        carrier.es_pickup = es_pickup;
    }
    if let Some(activo) = body.activo {
        carrier.activo = activo;
    }
    if let Some(prioridad) = body.prioridad_regex {
        carrier.prioridad_regex = prioridad;
    }

    Ok(Json(state.store.update_carrier(&carrier).await?))
}
