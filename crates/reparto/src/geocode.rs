//! Address → coordinate resolution: persistent cache in front of a
//! provider cascade, with region validation between the two.

use std::{sync::Arc, time::Instant};

use chrono::{Duration, Utc};
use log::warn;
use model::cache::GeoCacheEntry;

use crate::{
    billing,
    direccion,
    provider::{GeocodeCandidate, GeocodeProvider},
    region,
    store::{BillingRepo, GeoCacheRepo},
};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
    pub has_street_number: bool,
    pub provider: String,
    pub confidence: f64,
    pub from_cache: bool,
}

/// The provider cascade, in the order configured at wiring time.
#[derive(Clone)]
pub struct Geocoder {
    providers: Vec<Arc<dyn GeocodeProvider>>,
}

impl Geocoder {
    pub fn new(providers: Vec<Arc<dyn GeocodeProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolves an address. `None` when every provider failed or every
    /// candidate was rejected by the region validation.
    pub async fn lookup<S>(
        &self,
        store: &S,
        address: &str,
        cache_ttl_days: i64,
        run_id: &str,
        stage: &str,
    ) -> Option<GeocodeResult>
    where
        S: GeoCacheRepo + BillingRepo + Sync + ?Sized,
    {
        if address.trim().is_empty() {
            return None;
        }

        let normalized = direccion::normalize(address);
        let cache_key = direccion::normalize_key(address);

        match store.geo_cache_lookup(&cache_key, Utc::now()).await {
            Ok(Some(hit)) => {
                return Some(GeocodeResult {
                    lat: hit.lat,
                    lng: hit.lng,
                    formatted_address: hit.formatted_address.unwrap_or_default(),
                    has_street_number: hit.has_street_number,
                    provider: hit.provider.unwrap_or_else(|| "cache".to_owned()),
                    confidence: hit.score.unwrap_or(1.0),
                    from_cache: true,
                });
            }
            Ok(None) => {}
            Err(why) => warn!("geo cache lookup failed for '{cache_key}': {why}"),
        }

        for provider in &self.providers {
            let started = Instant::now();
            let outcome = provider.geocode(&normalized).await;
            let latency_ms = started.elapsed().as_millis() as i32;

            let candidate = match outcome {
                Ok(candidate) => {
                    billing::record(
                        store,
                        run_id,
                        stage,
                        provider.name(),
                        "geocode",
                        1,
                        Some(200),
                        latency_ms,
                    )
                    .await;
                    candidate
                }
                Err(why) => {
                    warn!("geocode {} error for '{address}': {why}", provider.name());
                    billing::record(
                        store,
                        run_id,
                        stage,
                        provider.name(),
                        "geocode",
                        1,
                        why.status.map(i32::from),
                        latency_ms,
                    )
                    .await;
                    continue;
                }
            };

            let Some(candidate) = candidate else { continue };
            if !validate_candidate(&candidate) {
                continue;
            }

            let entry = GeoCacheEntry {
                id: 0,
                key_normalizada: cache_key.clone(),
                query_original: address.to_owned(),
                lat: candidate.lat,
                lng: candidate.lng,
                formatted_address: Some(candidate.formatted_address.clone()),
                has_street_number: candidate.has_street_number,
                provider: Some(provider.name().to_owned()),
                score: Some(candidate.confidence),
                created_at: None,
                expires_at: Some(Utc::now() + Duration::days(cache_ttl_days)),
            };
            if let Err(why) = store.geo_cache_store(&entry).await {
                warn!("geo cache write failed for '{cache_key}': {why}");
            }

            return Some(GeocodeResult {
                lat: candidate.lat,
                lng: candidate.lng,
                formatted_address: candidate.formatted_address,
                has_street_number: candidate.has_street_number,
                provider: provider.name().to_owned(),
                confidence: candidate.confidence,
                from_cache: false,
            });
        }

        warn!("geocoding exhausted all providers for: {address}");
        None
    }
}

/// A usable candidate is a real point strictly inside the operating
/// region that is not a bare city centroid.
fn validate_candidate(candidate: &GeocodeCandidate) -> bool {
    if candidate.lat == 0.0 && candidate.lng == 0.0 {
        return false;
    }
    if !region::is_in_region(candidate.lat, candidate.lng) {
        return false;
    }
    if region::is_known_city_center(candidate.lat, candidate.lng) {
        return false;
    }
    true
}
