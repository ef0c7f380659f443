use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use model::remito::{Clasificacion, Lifecycle, Remito};
use reparto::{
    entregas,
    pipeline::{IngestResult, NuevoRemito, ProcessPendingResult, RemitoUpdate},
    store::{RemitoFilter, RemitoRepo},
};
use serde::Deserialize;

use crate::{
    common::{ApiError, ApiResult, OkResponse, PaginatedResponse},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/reprocess-all", post(reprocess_all))
        .route("/pendientes", get(pendientes))
        .route("/", post(create).get(list))
        .route("/:numero", get(get_one).put(update).delete(remove))
        .route("/:numero/direccion", put(correct_direccion))
        .route("/:numero/clasificacion", put(update_clasificacion))
        .route("/:numero/armado", put(advance_armado))
        .route("/:numero/reprocess", post(reprocess))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IngestBody {
    numeros: Vec<String>,
    source: Option<String>,
}

async fn ingest(
    State(state): State<WebState>,
    Json(body): Json<IngestBody>,
) -> ApiResult<IngestResult> {
    let source = body.source.as_deref().unwrap_or("manual");
    let result = state.pipeline.ingest_batch(&body.numeros, source).await?;
    Ok(Json(result))
}

async fn create(
    State(state): State<WebState>,
    Json(body): Json<NuevoRemito>,
) -> ApiResult<Remito> {
    Ok(Json(state.pipeline.create_single(body).await?))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<usize>,
    size: Option<usize>,
    estado_clasificacion: Option<String>,
    estado_lifecycle: Option<String>,
    q: Option<String>,
}

async fn list(
    State(state): State<WebState>,
    Query(params): Query<ListParams>,
) -> ApiResult<PaginatedResponse<Remito>> {
    let clasificacion = match &params.estado_clasificacion {
        Some(raw) => Some(Clasificacion::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!("clasificación desconocida: {raw}"))
        })?),
        None => None,
    };
    let lifecycle = match &params.estado_lifecycle {
        Some(raw) => Some(Lifecycle::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!("estado desconocido: {raw}"))
        })?),
        None => None,
    };

    let filter = RemitoFilter {
        clasificacion,
        lifecycle,
        query: params.q,
        page: params.page.unwrap_or(1).max(1),
        size: params.size.unwrap_or(50).clamp(1, 200),
    };
    let (items, total) = state.store.list_remitos(&filter).await?;
    let pages = (total + filter.size as i64 - 1) / filter.size as i64;
    Ok(Json(PaginatedResponse {
        items,
        total,
        page: filter.page,
        size: filter.size,
        pages,
    }))
}

async fn pendientes(State(state): State<WebState>) -> ApiResult<Vec<Remito>> {
    Ok(Json(state.store.remitos_pendientes().await?))
}

async fn get_one(
    State(state): State<WebState>,
    Path(numero): Path<String>,
) -> ApiResult<Remito> {
    state
        .store
        .remito_by_numero(&numero.trim().to_uppercase())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Remito"))
}

async fn update(
    State(state): State<WebState>,
    Path(numero): Path<String>,
    Json(body): Json<RemitoUpdate>,
) -> ApiResult<Remito> {
    Ok(Json(state.pipeline.update_attributes(&numero, body).await?))
}

#[derive(Debug, Deserialize)]
struct DireccionBody {
    direccion: String,
}

async fn correct_direccion(
    State(state): State<WebState>,
    Path(numero): Path<String>,
    Json(body): Json<DireccionBody>,
) -> ApiResult<Remito> {
    Ok(Json(
        state
            .pipeline
            .correct_address(&numero, &body.direccion)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct ClasificacionBody {
    clasificacion: String,
    motivo: Option<String>,
}

async fn update_clasificacion(
    State(state): State<WebState>,
    Path(numero): Path<String>,
    Json(body): Json<ClasificacionBody>,
) -> ApiResult<Remito> {
    let clasificacion =
        Clasificacion::parse(&body.clasificacion).ok_or_else(|| {
            ApiError::bad_request(format!(
                "clasificación desconocida: {}",
                body.clasificacion
            ))
        })?;
    Ok(Json(
        state
            .pipeline
            .override_clasificacion(&numero, clasificacion, body.motivo)
            .await?,
    ))
}

async fn advance_armado(
    State(state): State<WebState>,
    Path(numero): Path<String>,
) -> ApiResult<Remito> {
    Ok(Json(
        entregas::advance_to_armado(state.store.as_ref(), &numero).await?,
    ))
}

async fn reprocess(
    State(state): State<WebState>,
    Path(numero): Path<String>,
) -> ApiResult<Remito> {
    Ok(Json(state.pipeline.reprocess(&numero).await?))
}

async fn reprocess_all(
    State(state): State<WebState>,
) -> ApiResult<ProcessPendingResult> {
    Ok(Json(state.pipeline.process_pending().await?))
}

async fn remove(
    State(state): State<WebState>,
    Path(numero): Path<String>,
) -> ApiResult<OkResponse> {
    let numero = numero.trim().to_uppercase();
    let remito = state
        .store
        .remito_by_numero(&numero)
        .await?
        .ok_or_else(|| ApiError::not_found("Remito"))?;
    state.store.delete_remito(remito.id).await?;
    Ok(Json(OkResponse::new(format!("Remito {numero} eliminado"))))
}
