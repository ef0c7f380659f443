use std::{collections::HashMap, sync::Arc};

use database::PgStore;
use gmaps::GoogleMapsClient;
use mapbox::MapboxClient;
use openai::OpenAiClient;
use ors::OrsClient;
use reparto::{
    geocode::Geocoder,
    pipeline::Pipeline,
    provider::{GeocodeProvider, MatrixProvider, TransportClassifier},
    ruta::RouteBuilder,
    settings::Settings,
};
use web::{start_web_server, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = Settings::from_env();

    // database
    let store = Arc::new(
        PgStore::connect(&settings.database_url)
            .await
            .expect("could not connect to database."),
    );

    // geocoding cascade, in the configured order, keyless providers out
    let mut geocode_providers: Vec<Arc<dyn GeocodeProvider>> = Vec::new();
    let mut matrix_providers: HashMap<String, Arc<dyn MatrixProvider>> =
        HashMap::new();
    for provider in &settings.geocode_provider_order {
        match provider.as_str() {
            "ors" => {
                if let Some(key) = &settings.ors_api_key {
                    geocode_providers.push(Arc::new(OrsClient::new(key.clone())));
                    matrix_providers.insert(
                        "ors".to_owned(),
                        Arc::new(OrsClient::new(key.clone())),
                    );
                }
            }
            "mapbox" => {
                if let Some(token) = &settings.mapbox_token {
                    geocode_providers
                        .push(Arc::new(MapboxClient::new(token.clone())));
                    matrix_providers.insert(
                        "mapbox".to_owned(),
                        Arc::new(MapboxClient::new(token.clone())),
                    );
                }
            }
            "google" => {
                if let Some(key) = &settings.google_maps_api_key {
                    geocode_providers
                        .push(Arc::new(GoogleMapsClient::new(key.clone())));
                    matrix_providers.insert(
                        "google".to_owned(),
                        Arc::new(GoogleMapsClient::new(key.clone())),
                    );
                }
            }
            other => log::warn!("unknown geocode provider '{other}' ignored"),
        }
    }
    if geocode_providers.is_empty() {
        log::warn!("no geocoding provider configured; pipeline will not resolve addresses");
    }
    let geocoder = Geocoder::new(geocode_providers);

    // optional AI classifier
    let ai: Option<Arc<dyn TransportClassifier>> = match &settings.openai_api_key {
        Some(key) => {
            let vocabulario = match reparto::store::CarrierRepo::list_carriers(
                store.as_ref(),
            )
            .await
            {
                Ok(carriers) => carriers
                    .into_iter()
                    .map(|carrier| carrier.nombre_canonico)
                    .collect(),
                Err(why) => {
                    log::warn!("could not load carrier vocabulary: {why}");
                    vec![]
                }
            };
            Some(Arc::new(OpenAiClient::new(key.clone(), vocabulario)))
        }
        None => None,
    };

    // hourly cache compaction
    {
        let store = store.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(3600));
            loop {
                ticker.tick().await;
                match store.purge_expired_caches(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(removed) => {
                        log::info!("cache compaction removed {removed} rows")
                    }
                    Err(why) => log::warn!("cache compaction failed: {why}"),
                }
            }
        });
    }

    let pipeline = Arc::new(Pipeline::new(store.clone(), geocoder.clone(), ai));
    let route_builder = Arc::new(RouteBuilder::new(
        store.clone(),
        matrix_providers,
        settings.matrix_cache_ttl_secs,
    ));

    let bind_address = settings.bind_address.clone();
    let web_future = start_web_server(
        WebState {
            store,
            pipeline,
            route_builder,
            geocoder,
        },
        &bind_address,
    );

    let _ = web_future.await;
}
