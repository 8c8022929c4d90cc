use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::liqpay::checkout::CheckoutError;
use crate::ports::{AcquirerLookupError, RepositoryError};

/// Errors of the JSON endpoints. The provider callback never uses these; it
/// always answers 200 with a plain-text verdict.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(RepositoryError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            RepositoryError::Conflict(what) => AppError::Conflict(what),
            other => AppError::Database(other),
        }
    }
}

impl From<AcquirerLookupError> for AppError {
    fn from(err: AcquirerLookupError) -> Self {
        match err {
            AcquirerLookupError::NotFound(_) => {
                AppError::NotFound("LiqPay acquirer is not configured".to_string())
            }
            AcquirerLookupError::Ambiguous(_) => {
                AppError::Conflict("More than one LiqPay acquirer is configured".to_string())
            }
            AcquirerLookupError::Repository(err) => AppError::from(err),
        }
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Checkout(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
