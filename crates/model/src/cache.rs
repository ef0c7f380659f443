use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One resolved address. Keyed by the normalized cache key; rows past
/// `expires_at` are treated as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoCacheEntry {
    pub id: i32,
    pub key_normalizada: String,
    pub query_original: String,
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: Option<String>,
    pub has_street_number: bool,
    pub provider: Option<String>,
    pub score: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One directed origin→destination travel time. Reads match any provider
/// within a small per-axis coordinate tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixCacheEntry {
    pub id: i32,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub duration_sec: f64,
    pub distance_m: Option<f64>,
    pub provider: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}
