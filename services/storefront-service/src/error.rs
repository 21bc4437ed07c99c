// =============================================================================
// ERROR MODULE
// =============================================================================
// Application error taxonomy and its HTTP mapping.
//
// - NotFound          - a specific ID is absent (404)
// - Validation        - input fails field constraints, nothing written (400)
// - StoreUnavailable  - a physical write failed (503)
// - Unauthorized      - missing credentials or token (401)
// - Forbidden         - invalid or expired token (403)
// - Internal          - anything else (500)
//
// Store-level errors (`StoreError`) are converted here, so no raw I/O or
// driver error ever reaches a handler.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::pricing::PricingError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        // Internal details stay in the logs
        let message = match &self {
            AppError::Internal(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code, message = %message, "Request rejected");
        }

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// CONVERSION HELPERS
// =============================================================================

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => AppError::Validation(msg),
            unavailable @ StoreError::Unavailable { .. } => {
                AppError::StoreUnavailable(unavailable.to_string())
            }
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Backend;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::not_found("Product"), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::StoreUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_store_errors_map_into_taxonomy() {
        let validation: AppError = StoreError::Validation("bad".into()).into();
        assert!(matches!(validation, AppError::Validation(msg) if msg == "bad"));

        let unavailable: AppError = StoreError::unavailable(Backend::File, "disk full").into();
        assert!(matches!(unavailable, AppError::StoreUnavailable(msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::not_found("Order").to_string(), "Order not found");
    }
}
