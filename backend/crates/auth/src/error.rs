//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordPolicyError;
use thiserror::Error;

use crate::domain::policy::AccessDenied;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("An account already exists for this email")]
    EmailTaken,

    /// Unknown email and wrong password are indistinguishable
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been banned")]
    AccountBanned,

    #[error("Too many attempts, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Access(#[from] AccessDenied),

    #[error("{0}")]
    BadInput(String),

    #[error("Password rejected: {0}")]
    PasswordPolicy(#[from] PasswordPolicyError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::InvalidCredentials => ErrorKind::Unauthorized,
            AuthError::AccountBanned => ErrorKind::Forbidden,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::Access(denied) => denied.kind(),
            AuthError::BadInput(_) | AuthError::PasswordPolicy(_) => ErrorKind::BadRequest,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            // never echo driver messages to clients
            AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            AuthError::AccountBanned => {
                AppError::new(self.kind(), self.to_string()).with_action("Contact support")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountBanned => {
                tracing::warn!("Login attempt on banned account");
            }
            AuthError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Auth rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let mut response = self.to_app_error().into_response();
        if let AuthError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest | ErrorKind::UnprocessableEntity => {
                AuthError::BadInput(err.message().to_string())
            }
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl AccessDenied {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessDenied::Unauthenticated => ErrorKind::Unauthorized,
            AccessDenied::Forbidden => ErrorKind::Forbidden,
            AccessDenied::NotFound => ErrorKind::NotFound,
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        AppError::new(denied.kind(), denied.to_string())
    }
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        tracing::debug!(denied = ?self, "Request refused");
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AccountBanned.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::EmailTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::RateLimited { retry_after_secs: 3 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AuthError::BadInput("x".into()).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_access_denied_is_not_collapsed() {
        assert_eq!(AuthError::from(AccessDenied::Unauthenticated).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::from(AccessDenied::Forbidden).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::from(AccessDenied::NotFound).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_app_error_becomes_bad_input() {
        let err = AuthError::from(AppError::bad_request("Invalid email format"));
        assert!(matches!(err, AuthError::BadInput(ref m) if m == "Invalid email format"));
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AuthError::Internal("seal failed: key".into());
        assert_eq!(err.to_app_error().message(), "Internal server error");
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
