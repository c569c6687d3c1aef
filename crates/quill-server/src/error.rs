use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use quill_shared::{TokenError, ValidationError};
use quill_store::StoreError;

/// API-level failure. Every variant carries the machine-readable code and
/// human message that end up in the error envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    Auth { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// A collaborator (mail transport) failed after our own work succeeded.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn auth(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Auth {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::Auth { code, message } => (StatusCode::UNAUTHORIZED, code, message),
            ApiError::Forbidden { code, message } => (StatusCode::FORBIDDEN, code, message),
            ApiError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            ApiError::Upstream(detail) => {
                tracing::error!(error = %detail, "Upstream collaborator failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "An upstream service failed, please try again".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "code": code,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { field } => ApiError::Conflict {
                code: conflict_code(field),
                message: format!("That {field} is already registered"),
            },
            // Handlers that can say which entity missed map NotFound
            // themselves before `?`; this is the fallback.
            StoreError::NotFound => ApiError::not_found("NOT_FOUND", "Resource not found"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub fn conflict_code(field: &str) -> &'static str {
    match field {
        "email" => "EMAIL_EXISTS",
        "username" => "USERNAME_EXISTS",
        _ => "CONFLICT",
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        let code = match &e {
            ValidationError::UsernameLength | ValidationError::UsernameCharset => {
                "INVALID_USERNAME"
            }
            ValidationError::EmailFormat => "INVALID_EMAIL",
            ValidationError::PasswordPolicy(_) => "WEAK_PASSWORD",
            ValidationError::ImageUrl => "INVALID_IMAGE_URL",
            ValidationError::TitleRequired => "TITLE_REQUIRED",
            ValidationError::TitleTooLong(_) => "TITLE_TOO_LONG",
            ValidationError::ContentRequired => "CONTENT_REQUIRED",
            ValidationError::CommentRequired => "COMMENT_REQUIRED",
            ValidationError::CommentTooLong(_) => "COMMENT_TOO_LONG",
        };
        ApiError::validation(code, e.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => {
                ApiError::auth("TOKEN_EXPIRED", "Token has expired, please request a new one")
            }
            TokenError::Invalid | TokenError::Purpose => {
                ApiError::auth("INVALID_TOKEN", "Invalid authentication token")
            }
            TokenError::Signing => ApiError::Internal("Token signing failed".to_string()),
        }
    }
}
