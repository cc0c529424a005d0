//! Consistent error responses: every failure is `{"error": code, "message": text}`.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use paksa_assistant::AssistantError;
use paksa_auth::{AuthzError, PasswordError};
use paksa_core::DomainError;
use paksa_infra::StoreError;

pub const CREDENTIALS_ERROR: &str = "Could not validate credentials";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Answered with `WWW-Authenticate: Bearer`.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    LicenseInvalid(String),

    #[error("{0}")]
    FeatureDisabled(String),

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn credentials() -> Self {
        ApiError::Unauthorized(CREDENTIALS_ERROR.to_string())
    }

    pub fn inactive_user() -> Self {
        ApiError::BadRequest("Inactive user".to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::LicenseInvalid(_) => (StatusCode::FORBIDDEN, "license_invalid"),
            ApiError::FeatureDisabled(_) => (StatusCode::FORBIDDEN, "feature_disabled"),
            ApiError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "request failed");
                "Internal server error".to_string()
            }
            ApiError::RateLimited { .. } => "Too many requests".to_string(),
            other => other.to_string(),
        };

        let mut resp = json_error(status, code, message);
        match self {
            ApiError::Unauthorized(_) => {
                resp.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            ApiError::RateLimited { retry_after_secs } => {
                resp.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            _ => {}
        }
        resp
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let detail = err.detail();
        match err {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ApiError::Validation(detail),
            DomainError::NotFound => ApiError::NotFound(detail),
            DomainError::Conflict(_) => ApiError::Conflict(detail),
            DomainError::Unauthorized => ApiError::Forbidden(detail),
            DomainError::InvariantViolation(_) => ApiError::Internal(detail),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(msg) => ApiError::Validation(msg.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::InvalidInput(msg) => ApiError::Validation(msg),
            AssistantError::Internal(msg) => ApiError::Internal(msg),
            other => {
                tracing::warn!(error = %other, "chat model call failed");
                ApiError::Upstream("The assistant is temporarily unavailable".to_string())
            }
        }
    }
}
