//! Error taxonomy and its HTTP mapping.
//!
//! Every handler returns `Result<_, ApiError>`; status codes are decided
//! here and nowhere else. Bodies are `{"message": "..."}` across the board.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage error")]
    Store(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    /// Remap a unique-constraint violation into a validation failure.
    ///
    /// Update endpoints surface duplicates as 4xx while creation endpoints
    /// leave them as store failures (5xx).
    pub fn duplicate_as_validation(self, message: &str) -> Self {
        match &self {
            Self::Store(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Self::Validation(message.to_string())
            }
            _ => self,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(e) => {
                tracing::error!(error = %e, "store operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = ApiError::validation("name is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::not_found("cart").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failure_maps_to_500() {
        let response = ApiError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_message_names_the_resource() {
        assert_eq!(ApiError::not_found("order").to_string(), "order not found");
    }

    #[test]
    fn duplicate_remap_leaves_other_errors_alone() {
        let err = ApiError::from(sqlx::Error::RowNotFound).duplicate_as_validation("duplicate");
        assert!(matches!(err, ApiError::Store(_)));
    }
}
