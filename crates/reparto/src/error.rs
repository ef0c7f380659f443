use std::{error::Error, fmt};

use crate::store::StoreError;

/// Component-neutral error taxonomy surfaced to the operator layer.
/// Provider failures are not part of it: they are recovered locally
/// (next provider, haversine fallback, AI suppressed) and only leave a
/// billing trace and a diagnostic behind.
#[derive(Debug)]
pub enum ServiceError {
    /// Requested entity (remito, ruta, carrier, archive row) is absent.
    NotFound(String),
    /// Uniqueness violation (duplicate numero or carrier name).
    Conflict(String),
    /// The lifecycle would regress.
    InvalidTransition(String),
    /// Input fails a constraint (unknown config key, bad state value).
    Validation(String),
    /// Unexpected failure; full detail stays in the logs.
    Internal(Box<dyn Error + Send + Sync>),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found<S: Into<String>>(entity: S) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn internal<E: Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Internal(Box::new(why))
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} no encontrado"),
            Self::Conflict(detail) => write!(f, "conflicto: {detail}"),
            Self::InvalidTransition(detail) => {
                write!(f, "transición de estado no permitida: {detail}")
            }
            Self::Validation(detail) => write!(f, "validación: {detail}"),
            Self::Internal(why) => write!(f, "error interno: {why}"),
        }
    }
}

impl Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound("recurso".to_owned()),
            StoreError::Conflict(detail) => Self::Conflict(detail),
            StoreError::Other(why) => Self::Internal(why),
        }
    }
}
