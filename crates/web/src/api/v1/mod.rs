use axum::Router;

use crate::WebState;

pub mod billing;
pub mod carriers;
pub mod config;
pub mod entregados;
pub mod geocode;
pub mod historico;
pub mod pedidos_listos;
pub mod remitos;
pub mod rutas;

pub fn routes(state: WebState) -> Router {
    Router::new()
        .nest("/remitos", remitos::routes(state.clone()))
        .nest("/rutas", rutas::routes(state.clone()))
        .nest("/entregados", entregados::routes(state.clone()))
        .nest("/historico", historico::routes(state.clone()))
        .nest("/carriers", carriers::routes(state.clone()))
        .nest("/config", config::routes(state.clone()))
        .nest("/geocode", geocode::routes(state.clone()))
        .nest("/pedidos-listos", pedidos_listos::routes(state.clone()))
        .nest("/billing", billing::routes(state))
}
