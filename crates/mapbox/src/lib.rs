//! Mapbox client: places geocoding and the directions matrix.

use async_trait::async_trait;
use model::Coordinate;
use reparto::provider::{
    GeocodeCandidate, GeocodeProvider, MatrixProvider, ProviderError,
    GEOCODE_TIMEOUT, MATRIX_TIMEOUT,
};
use reparto::region::MENDOZA_BBOX;
use serde::Deserialize;

pub const MAPBOX_API_URL: &str = "https://api.mapbox.com";

pub struct MapboxClient {
    access_token: String,
    base_url: String,
    http: reqwest::Client,
}

impl MapboxClient {
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: MAPBOX_API_URL.to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn bbox_param() -> String {
        format!(
            "{},{},{},{}",
            MENDOZA_BBOX.min_longitude,
            MENDOZA_BBOX.min_latitude,
            MENDOZA_BBOX.max_longitude,
            MENDOZA_BBOX.max_latitude
        )
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
    relevance: Option<f64>,
    place_name: Option<String>,
    #[serde(default)]
    place_type: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lng, lat]`
    coordinates: Vec<f64>,
}

fn reduce_geocode(response: GeocodeResponse) -> Option<GeocodeCandidate> {
    let feature = response.features.into_iter().next()?;
    let lng = *feature.geometry.coordinates.first()?;
    let lat = *feature.geometry.coordinates.get(1)?;
    Some(GeocodeCandidate {
        lat,
        lng,
        formatted_address: feature.place_name.unwrap_or_default(),
        // Mapbox has no house-number field; an `address`-typed place is
        // the closest signal for street-level precision.
        has_street_number: feature.place_type.iter().any(|t| t == "address"),
        confidence: feature.relevance.unwrap_or(0.5),
    })
}

#[async_trait]
impl GeocodeProvider for MapboxClient {
    fn name(&self) -> &'static str {
        "mapbox"
    }

    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodeCandidate>, ProviderError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|why| ProviderError::parse(why.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::parse("invalid base url"))?
            .extend(["geocoding", "v5", "mapbox.places"])
            .push(&format!("{address}, Mendoza, Argentina.json"));

        let response = self
            .http
            .get(url)
            .timeout(GEOCODE_TIMEOUT)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("country", "ar"),
                ("bbox", &Self::bbox_param()),
                ("limit", "1"),
                ("types", "address"),
            ])
            .send()
            .await
            .map_err(convert_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "places geocoding failed",
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
    durations: Vec<Vec<Option<f64>>>,
}

#[async_trait]
impl MatrixProvider for MapboxClient {
    fn name(&self) -> &'static str {
        "mapbox"
    }

    async fn matrix_block(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
        let coords = origins
            .iter()
            .chain(destinations.iter())
            .map(|point| format!("{},{}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");
        let sources = (0..origins.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let dests = (origins.len()..origins.len() + destinations.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");

        let url = format!(
            "{}/directions-matrix/v1/mapbox/driving/{coords}",
            self.base_url
        );
        let response = self
            .http
            .get(url)
            .timeout(MATRIX_TIMEOUT)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("sources", &sources),
                ("destinations", &dests),
                ("annotations", "duration"),
            ])
            .send()
            .await
            .map_err(convert_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::status(
                response.status().as_u16(),
                "directions matrix failed",
            ));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|why| ProviderError::parse(why.to_string()))?;
        Ok(body.durations)
    }
}
