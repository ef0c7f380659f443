use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use model::{
    config::RouteConfigOverride,
    ruta::{ParadaEstado, Ruta, RutaEstado, RutaExcluido, RutaParada},
};
use reparto::store::RutaRepo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    common::{ApiError, ApiResult, OkResponse},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/generar", post(generar))
        .route("/", get(list))
        .route("/latest", get(latest))
        .route("/:id", get(get_one).delete(remove))
        .route("/:id/geojson", get(geojson))
        .route("/:id/gmaps-links", get(gmaps_links))
        .route("/:id/estado", put(update_estado))
        .route("/:id/paradas/:parada_id/estado", put(update_parada_estado))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize)]
struct RutaResponse {
    #[serde(flatten)]
    ruta: Ruta,
    paradas: Vec<RutaParada>,
    excluidos: Vec<RutaExcluido>,
}

async fn load_full(state: &WebState, id: i32) -> Result<RutaResponse, ApiError> {
    let ruta = state
        .store
        .ruta_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ruta"))?;
    let paradas = state.store.paradas_de_ruta(id).await?;
    let excluidos = state.store.excluidos_de_ruta(id).await?;
    Ok(RutaResponse {
        ruta,
        paradas,
        excluidos,
    })
}

async fn generar(
    State(state): State<WebState>,
    body: Option<Json<RouteConfigOverride>>,
) -> ApiResult<RutaResponse> {
    let ruta = state
        .route_builder
        .generate(body.map(|Json(over)| over))
        .await?;
    Ok(Json(load_full(&state, ruta.id).await?))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

async fn list(
    State(state): State<WebState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Ruta>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(state.store.list_rutas(limit).await?))
}

async fn latest(State(state): State<WebState>) -> ApiResult<RutaResponse> {
    let ruta = state
        .store
        .ruta_latest()
        .await?
        .ok_or_else(|| ApiError::not_found("Ruta"))?;
    Ok(Json(load_full(&state, ruta.id).await?))
}

async fn get_one(
    State(state): State<WebState>,
    Path(id): Path<i32>,
) -> ApiResult<RutaResponse> {
    Ok(Json(load_full(&state, id).await?))
}

async fn geojson(
    State(state): State<WebState>,
    Path(id): Path<i32>,
) -> ApiResult<Value> {
    let full = load_full(&state, id).await?;

    let mut features: Vec<Value> = full
        .paradas
        .iter()
        .filter_map(|parada| {
            let (lat, lng) = (parada.lat_snapshot?, parada.lng_snapshot?);
            Some(json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [lng, lat]},
                "properties": {
                    "orden": parada.orden,
                    "remito_numero": parada.remito_numero,
                    "estado": parada.estado,
                    "minutos_acumulados": parada.minutos_acumulados,
                    "es_urgente": parada.es_urgente,
                },
            }))
        })
        .collect();

    if let Some(line) = &full.ruta.ruta_linea {
        features.push(json!({
            "type": "Feature",
            "geometry": {"type": "LineString", "coordinates": line},
            "properties": {"tipo": "ruta_linea"},
        }));
    }

    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
    })))
}

async fn gmaps_links(
    State(state): State<WebState>,
    Path(id): Path<i32>,
) -> ApiResult<Value> {
    let ruta = state
        .store
        .ruta_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ruta"))?;
    Ok(Json(json!({
        "links": ruta.gmaps_links,
        "count": ruta.gmaps_links.len(),
    })))
}

#[derive(Debug, Deserialize)]
struct EstadoBody {
    estado: String,
}

async fn update_estado(
    State(state): State<WebState>,
    Path(id): Path<i32>,
    Json(body): Json<EstadoBody>,
) -> ApiResult<OkResponse> {
    let estado = RutaEstado::parse(&body.estado).ok_or_else(|| {
        ApiError::bad_request(format!("estado de ruta desconocido: {}", body.estado))
    })?;
    state.store.set_ruta_estado(id, estado).await?;
    Ok(Json(OkResponse::new(format!(
        "Estado actualizado a '{}'",
        estado.as_str()
    ))))
}

async fn update_parada_estado(
    State(state): State<WebState>,
    Path((id, parada_id)): Path<(i32, i32)>,
    Json(body): Json<EstadoBody>,
) -> ApiResult<OkResponse> {
    let estado = ParadaEstado::parse(&body.estado).ok_or_else(|| {
        ApiError::bad_request(format!(
            "estado de parada desconocido: {}",
            body.estado
        ))
    })?;
    state.store.set_parada_estado(id, parada_id, estado).await?;
    Ok(Json(OkResponse::new(format!(
        "Parada {parada_id} actualizada"
    ))))
}

async fn remove(
    State(state): State<WebState>,
    Path(id): Path<i32>,
) -> ApiResult<OkResponse> {
    state.store.delete_ruta(id).await?;
    Ok(Json(OkResponse::new(format!("Ruta {id} eliminada"))))
}
