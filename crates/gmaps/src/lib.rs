//! Google Maps Platform client: geocoding and the distance matrix.

use async_trait::async_trait;
use model::Coordinate;
use reparto::provider::{
    GeocodeCandidate, GeocodeProvider, MatrixProvider, ProviderError,
    GEOCODE_TIMEOUT, MATRIX_TIMEOUT,
};
use serde::Deserialize;

pub const GOOGLE_MAPS_API_URL: &str = "https://maps.googleapis.com";

pub struct GoogleMapsClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl GoogleMapsClient {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GOOGLE_MAPS_API_URL.to_owned(),
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
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    #[serde(default)]
    types: Vec<String>,
}

fn reduce_geocode(response: GeocodeResponse) -> Option<GeocodeCandidate> {
    let result = response.results.into_iter().next()?;
    let has_street_number = result
        .address_components
        .iter()
        .any(|component| component.types.iter().any(|t| t == "street_number"));
    // No confidence field; the location type is the usual proxy.
    let confidence = match result.geometry.location_type.as_deref() {
        Some("ROOFTOP") => 0.99,
        Some("RANGE_INTERPOLATED") => 0.8,
        Some("GEOMETRIC_CENTER") => 0.6,
        Some("APPROXIMATE") => 0.3,
        _ => 0.5,
    };
    Some(GeocodeCandidate {
        lat: result.geometry.location.lat,
        lng: result.geometry.location.lng,
        formatted_address: result.formatted_address.unwrap_or_default(),
        has_street_number,
        confidence,
    })
}

#[async_trait]
impl GeocodeProvider for GoogleMapsClient {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodeCandidate>, ProviderError> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let response = self
            .http
            .get(url)
            .timeout(GEOCODE_TIMEOUT)
            .query(&[
                ("address", format!("{address}, Mendoza, Argentina").as_str()),
                ("key", self.api_key.as_str()),
                ("components", "country:AR|administrative_area:Mendoza"),
            ])
            .send()
            .await
            .map_err(convert_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "geocode failed",
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

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct Duration {
    value: f64,
}

fn reduce_matrix(response: MatrixResponse) -> Vec<Vec<Option<f64>>> {
    response
        .rows
        .into_iter()
        .map(|row| {
            row.elements
                .into_iter()
                .map(|element| {
                    if element.status == "OK" {
                        element.duration.map(|d| d.value)
                    } else {
                        None
                    }
                })
                .collect()
        })
        .collect()
}

#[async_trait]
impl MatrixProvider for GoogleMapsClient {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn matrix_block(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
        let join = |points: &[Coordinate]| {
            points
                .iter()
                .map(|point| format!("{},{}", point.lat, point.lng))
                .collect::<Vec<_>>()
                .join("|")
        };

        let url = format!("{}/maps/api/distancematrix/json", self.base_url);
        let response = self
            .http
            .get(url)
            .timeout(MATRIX_TIMEOUT)
            .query(&[
                ("origins", join(origins).as_str()),
                ("destinations", join(destinations).as_str()),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(convert_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "distance matrix failed",
            ));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|why| ProviderError::parse(why.to_string()))?;
        Ok(reduce_matrix(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooftop_with_street_number() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{
                "results": [{
                    "geometry": {
                        "location": {"lat": -32.9511, "lng": -68.8458},
                        "location_type": "ROOFTOP"
                    },
                    "address_components": [
                        {"types": ["street_number"]},
                        {"types": ["route"]}
                    ],
                    "formatted_address": "Av. San Martín 1200, Godoy Cruz, Mendoza"
                }]
            }"#,
        )
        .unwrap();
        let candidate = reduce_geocode(body).unwrap();
        assert!(candidate.has_street_number);
        assert_eq!(candidate.confidence, 0.99);
    }

    #[test]
    fn approximate_without_number() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{
                "results": [{
                    "geometry": {
                        "location": {"lat": -32.89, "lng": -68.82},
                        "location_type": "APPROXIMATE"
                    },
                    "formatted_address": "Mendoza, Argentina"
                }]
            }"#,
        )
        .unwrap();
        let candidate = reduce_geocode(body).unwrap();
        assert!(!candidate.has_street_number);
        assert_eq!(candidate.confidence, 0.3);
    }

    #[test]
    fn matrix_elements_null_when_not_ok() {
        let body: MatrixResponse = serde_json::from_str(
            r#"{
                "rows": [
                    {"elements": [
                        {"status": "OK", "duration": {"value": 540}},
                        {"status": "ZERO_RESULTS"}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(reduce_matrix(body), vec![vec![Some(540.0), None]]);
    }
}
