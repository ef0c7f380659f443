use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reparto::{store::StoreError, ServiceError};
use serde::Serialize;
use serde_json::json;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// JSON error response carrying the taxonomy's HTTP mapping.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: format!("{entity} no encontrado"),
        }
    }

    pub fn bad_request<S: Into<String>>(detail: S) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(why: ServiceError) -> Self {
        let status = match &why {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => {
                log::error!("internal error: {why}");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: "error interno".to_owned(),
                };
            }
        };
        Self {
            status,
            detail: why.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(why: StoreError) -> Self {
        ApiError::from(ServiceError::from(why))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
    pub message: String,
}

impl OkResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: usize,
    pub size: usize,
    pub pages: i64,
}
