use chrono::{DateTime, Utc};
use model::cache::GeoCacheEntry;
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct GeoCacheRow {
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

impl GeoCacheRow {
    pub fn to_model(self) -> GeoCacheEntry {
        GeoCacheEntry {
            id: self.id,
            key_normalizada: self.key_normalizada,
            query_original: self.query_original,
            lat: self.lat,
            lng: self.lng,
            formatted_address: self.formatted_address,
            has_street_number: self.has_street_number,
            provider: self.provider,
            score: self.score,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}
