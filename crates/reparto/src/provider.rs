use std::{error::Error, fmt, time::Duration};

use async_trait::async_trait;
use model::Coordinate;
use serde::Deserialize;

/// Deadline for a single forward-geocoding call.
pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for a single matrix-block call.
pub const MATRIX_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for the optional AI classifier call.
pub const AI_TIMEOUT: Duration = Duration::from_secs(15);

/// Failure of an external provider call: timeout, non-2xx or unparsable
/// body. Always recovered locally by the caller; the status code ends up
/// in the billing trace.
#[derive(Debug)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            message: message.into(),
        }
    }

    pub fn other<E: Error>(why: E) -> Self {
        Self {
            status: None,
            message: why.to_string(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "provider error ({code}): {}", self.message),
            None => write!(f, "provider error: {}", self.message),
        }
    }
}

impl Error for ProviderError {}

/// A raw candidate as reduced from one provider's response, before the
/// gateway validates it against the operating region.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
    pub has_street_number: bool,
    pub confidence: f64,
}

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Short provider key as persisted in caches and billing ("ors",
    /// "mapbox", "google").
    fn name(&self) -> &'static str;

    /// Forward-geocodes within the operating region's bounding box.
    /// Implementations enforce [`GEOCODE_TIMEOUT`]. `Ok(None)` means the
    /// provider answered but found nothing.
    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<GeocodeCandidate>, ProviderError>;
}

#[async_trait]
pub trait MatrixProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Travel durations in seconds, one row per origin. `None` cells are
    /// pairs the provider could not resolve. Implementations enforce
    /// [`MATRIX_TIMEOUT`].
    async fn matrix_block(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<Option<f64>>>, ProviderError>;
}

/// Answer of the optional AI transport classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct AiClassification {
    pub transportista: String,
    pub confianza: f64,
}

#[async_trait]
pub trait TransportClassifier: Send + Sync {
    /// `Ok(None)` when the classifier is disabled or could not produce
    /// an answer; errors are treated the same way by the caller.
    async fn classify(
        &self,
        texto: &str,
    ) -> Result<Option<AiClassification>, ProviderError>;
}
