use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    ContentUnavailable(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("Upstream temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to prepare video: {0}")]
    BuildFailed(String),

    #[error("Too many requests: {0}")]
    RateLimited(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl ApiError {
    pub const fn retryable(&self) -> bool {
        !matches!(
            self,
            Self::ValidationError(_)
                | Self::ContentUnavailable(_)
                | Self::AccessDenied(_)
                | Self::PayloadTooLarge(_)
        )
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError(_) | Self::BuildFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::ContentUnavailable(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::ContentUnavailable(msg) => Self::ContentUnavailable(msg),
            AppError::AccessDenied(msg) => Self::AccessDenied(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::TransientUpstream(msg) => Self::Unavailable(msg),
            AppError::BuildFailure(msg) => Self::BuildFailed(msg),
            AppError::Storage(_)
            | AppError::ObjectStore(_)
            | AppError::Io(_)
            | AppError::Serde(_) => {
                tracing::error!("Storage error: {:?}", err);
                Self::InternalError("Index storage error".to_string())
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::ValidationError(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::ValidationError(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.retryable();
        let error = match self {
            Self::InternalError(message)
            | Self::ValidationError(message)
            | Self::ContentUnavailable(message)
            | Self::AccessDenied(message)
            | Self::Unavailable(message)
            | Self::BuildFailed(message)
            | Self::RateLimited(message)
            | Self::PayloadTooLarge(message) => message,
        };

        (
            status,
            Json(ErrorResponse {
                error,
                status: "error".to_string(),
                retryable,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
    retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;

    // Helper to check status code
    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_app_error_to_api_error_conversion() {
        let unavailable = AppError::ContentUnavailable("no subtitles".to_string());
        let api_error = ApiError::from(unavailable);
        assert!(matches!(api_error, ApiError::ContentUnavailable(msg) if msg == "no subtitles"));

        let denied = AppError::AccessDenied("captions disabled".to_string());
        let api_error = ApiError::from(denied);
        assert!(matches!(api_error, ApiError::AccessDenied(msg) if msg == "captions disabled"));

        let validation = AppError::Validation("invalid input".to_string());
        let api_error = ApiError::from(validation);
        assert!(matches!(api_error, ApiError::ValidationError(msg) if msg == "invalid input"));

        let transient = AppError::TransientUpstream("rate limited".to_string());
        let api_error = ApiError::from(transient);
        assert!(matches!(api_error, ApiError::Unavailable(_)));

        let build = AppError::BuildFailure("embedding failed".to_string());
        let api_error = ApiError::from(build);
        assert!(matches!(api_error, ApiError::BuildFailed(_)));

        let internal_error = AppError::Io(std::io::Error::other("disk on fire"));
        let api_error = ApiError::from(internal_error);
        assert!(matches!(api_error, ApiError::InternalError(_)));
    }

    #[test]
    fn test_api_error_response_status_codes() {
        assert_status_code(
            ApiError::ContentUnavailable("missing".to_string()),
            StatusCode::NOT_FOUND,
        );
        assert_status_code(
            ApiError::AccessDenied("blocked".to_string()),
            StatusCode::FORBIDDEN,
        );
        assert_status_code(
            ApiError::ValidationError("invalid input".to_string()),
            StatusCode::BAD_REQUEST,
        );
        assert_status_code(
            ApiError::Unavailable("try later".to_string()),
            StatusCode::SERVICE_UNAVAILABLE,
        );
        assert_status_code(
            ApiError::BuildFailed("boom".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_status_code(
            ApiError::InternalError("server error".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_status_code(
            ApiError::RateLimited("slow down".to_string()),
            StatusCode::TOO_MANY_REQUESTS,
        );
        assert_status_code(
            ApiError::PayloadTooLarge("too big".to_string()),
            StatusCode::PAYLOAD_TOO_LARGE,
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(!ApiError::ContentUnavailable(String::new()).retryable());
        assert!(!ApiError::AccessDenied(String::new()).retryable());
        assert!(!ApiError::ValidationError(String::new()).retryable());
        assert!(!ApiError::PayloadTooLarge(String::new()).retryable());
        assert!(ApiError::Unavailable(String::new()).retryable());
        assert!(ApiError::BuildFailed(String::new()).retryable());
        assert!(ApiError::InternalError(String::new()).retryable());
        assert!(ApiError::RateLimited(String::new()).retryable());
    }

    #[test]
    fn test_internal_error_sanitization() {
        let api_error = ApiError::from(AppError::InternalError(
            "secret api key rejected".to_string(),
        ));

        assert!(matches!(&api_error, ApiError::InternalError(msg) if msg == "Internal server error"));
        assert_eq!(api_error.to_string(), "Internal server error");
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
