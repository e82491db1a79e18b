//! # API Error Types
//!
//! [`AppError`] implements `axum::response::IntoResponse` and is the only
//! error type handlers return. [`SystemError`] kinds map onto it as follows:
//!
//! | Kind                                   | Status | Code               |
//! |----------------------------------------|--------|--------------------|
//! | `*NotFound`                            | 404    | `NOT_FOUND`        |
//! | `*DuplicateName`, `ApplicationDuplicateId` | 409 | `ALREADY_EXISTS`  |
//! | `InvalidArgument`, malformed body      | 400    | `INVALID_ARGUMENT` |
//! | anything else                          | 500    | `INTERNAL`         |
//!
//! `details.reason` carries the taxonomy code (e.g. `APP_GROUP_DUPLICATE_NAME`).
//! Internal messages are logged and replaced in the response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use isp_core::SystemError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Status class: `NOT_FOUND`, `ALREADY_EXISTS`, `INVALID_ARGUMENT`, `INTERNAL`.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// `{"reason": "<taxonomy code>"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// The addressed record does not exist (404).
    #[error("{message}")]
    NotFound {
        message: String,
        reason: &'static str,
    },

    /// Malformed body or invalid argument (400).
    #[error("{message}")]
    BadRequest {
        message: String,
        reason: &'static str,
    },

    /// Uniqueness violation (409).
    #[error("{message}")]
    Conflict {
        message: String,
        reason: &'static str,
    },

    /// Any other failure (500). Logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A 400 for a body axum could not decode.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            reason: SystemError::InvalidArgument(String::new()).reason(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest { .. } => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { reason, .. }
            | Self::BadRequest { reason, .. }
            | Self::Conflict { reason, .. } => reason,
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: Some(serde_json::json!({ "reason": self.reason() })),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<SystemError> for AppError {
    fn from(err: SystemError) -> Self {
        let reason = err.reason();
        match err {
            SystemError::InvalidArgument(message) => Self::BadRequest { message, reason },
            SystemError::Internal(message) => Self::Internal(message),
            // Retries are exhausted by the time a collision reaches here.
            SystemError::TokenDuplicate => {
                Self::Internal("generated tokens kept colliding".to_string())
            }
            e if e.is_not_found() => Self::NotFound {
                message: e.to_string(),
                reason,
            },
            e if e.is_duplicate() => Self::Conflict {
                message: e.to_string(),
                reason,
            },
            e => Self::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn not_found_kinds_are_404() {
        for err in [
            SystemError::DomainNotFound,
            SystemError::AppGroupNotFound,
            SystemError::ApplicationNotFound,
            SystemError::SystemNotFound,
            SystemError::AccessListNotFound,
        ] {
            let (status, code) = AppError::from(err).status_and_code();
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(code, "NOT_FOUND");
        }
    }

    #[test]
    fn duplicates_are_409() {
        for err in [
            SystemError::DomainDuplicateName,
            SystemError::AppGroupDuplicateName,
            SystemError::ApplicationDuplicateName,
            SystemError::ApplicationDuplicateId,
        ] {
            let (status, code) = AppError::from(err).status_and_code();
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(code, "ALREADY_EXISTS");
        }
    }

    #[test]
    fn invalid_argument_is_400() {
        let err = AppError::from(SystemError::InvalidArgument("domain id list is empty".into()));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn exhausted_token_collision_is_500() {
        let err = AppError::from(SystemError::TokenDuplicate);
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn body_carries_reason() {
        let (status, body) = render(SystemError::AppGroupDuplicateName.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ALREADY_EXISTS");
        assert_eq!(
            body["error"]["message"],
            "application group with the same name already exists"
        );
        assert_eq!(body["error"]["details"]["reason"], "APP_GROUP_DUPLICATE_NAME");
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) =
            render(SystemError::Internal("password authentication failed".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_argument() {
        let (status, body) = render(AppError::malformed("expected value at line 1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["reason"], "INVALID_ARGUMENT");
    }
}
