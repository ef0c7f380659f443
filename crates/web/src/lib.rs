use std::sync::Arc;

use axum::Router;
use database::PgStore;
use reparto::{geocode::Geocoder, pipeline::Pipeline, ruta::RouteBuilder};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;

#[derive(Clone)]
pub struct WebState {
    pub store: Arc<PgStore>,
    pub pipeline: Arc<Pipeline<PgStore>>,
    pub route_builder: Arc<RouteBuilder<PgStore>>,
    pub geocoder: Geocoder,
}

pub async fn start_web_server(
    state: WebState,
    bind_address: &str,
) -> std::io::Result<()> {
    let routes = Router::new()
        .nest("/api", api::routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind_address).await?;
    log::info!("listening on {bind_address}");
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
