//! OpenRouteService client: forward geocoding (Pelias) and the
//! driving-car duration matrix.

use async_trait::async_trait;
use model::Coordinate;
use reparto::provider::{
    GeocodeCandidate, GeocodeProvider, MatrixProvider, ProviderError,
    GEOCODE_TIMEOUT, MATRIX_TIMEOUT,
};
use reparto::region::MENDOZA_BBOX;
use serde::Deserialize;

pub const ORS_API_URL: &str = "https://api.openrouteservice.org";

pub struct OrsClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OrsClient {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ORS_API_URL.to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn convert_error(why: reqwest::Error) -> ProviderError {
    match why.status() {
        Some(status) => ProviderError::status(status.as_u16(), why.to_string()),
        None => ProviderError::other(why),
    }
}

// - Geocoding -

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lng, lat]`
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    confidence: Option<f64>,
    housenumber: Option<String>,
    label: Option<String>,
}

fn reduce_geocode(response: GeocodeResponse) -> Option<GeocodeCandidate> {
    let feature = response.features.into_iter().next()?;
    let lng = *feature.geometry.coordinates.first()?;
    let lat = *feature.geometry.coordinates.get(1)?;
    Some(GeocodeCandidate {
        lat,
        lng,
        formatted_address: feature.properties.label.unwrap_or_default(),
        has_street_number: feature.properties.housenumber.is_some(),
        confidence: feature.properties.confidence.unwrap_or(0.5),
    })
}

#[async_trait]
impl GeocodeProvider for OrsClient {
    fn name(&self) -> &'static str {
        "ors"
    }

    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodeCandidate>, ProviderError> {
        let url = format!("{}/geocode/search", self.base_url);
        let response = self
            .http
            .get(url)
            .timeout(GEOCODE_TIMEOUT)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("text", &format!("{address}, Mendoza, Argentina")),
                ("boundary.rect.min_lng", &MENDOZA_BBOX.min_longitude.to_string()),
                ("boundary.rect.min_lat", &MENDOZA_BBOX.min_latitude.to_string()),
                ("boundary.rect.max_lng", &MENDOZA_BBOX.max_longitude.to_string()),
                ("boundary.rect.max_lat", &MENDOZA_BBOX.max_latitude.to_string()),
                ("size", "1"),
                ("layers", "address"),
            ])
            .send()
            .await
            .map_err(convert_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "geocode/search failed",
            ));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|why| ProviderError::parse(why.to_string()))?;
        Ok(reduce_geocode(body))
    }
}

// - Matrix -

#[derive(Debug, serde::Serialize)]
struct MatrixRequest {
    locations: Vec<[f64; 2]>,
    sources: Vec<usize>,
    destinations: Vec<usize>,
    metrics: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    durations: Vec<Vec<Option<f64>>>,
}

#[async_trait]
impl MatrixProvider for OrsClient {
    fn name(&self) -> &'static str {
        "ors"
    }

    async fn matrix_block(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
        let locations: Vec<[f64; 2]> = origins
            .iter()
            .chain(destinations.iter())
            .map(|point| [point.lng, point.lat])
            .collect();
        let body = MatrixRequest {
            locations,
            sources: (0..origins.len()).collect(),
            destinations: (origins.len()..origins.len() + destinations.len())
                .collect(),
            metrics: ["duration"],
        };

        let url = format!("{}/v2/matrix/driving-car", self.base_url);
        let response = self
            .http
            .post(url)
            .timeout(MATRIX_TIMEOUT)
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(convert_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "matrix request failed",
            ));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|why| ProviderError::parse(why.to_string()))?;
        Ok(body.durations)
    }
}
