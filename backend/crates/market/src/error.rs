//! Market Error Types
//!
//! Market-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use auth::AccessDenied;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type MarketResult<T> = Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error(transparent)]
    Access(#[from] AccessDenied),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadInput(String),

    /// The record is not in a state that allows the operation
    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient balance: {available_cents} cents available, {requested_cents} requested")]
    InsufficientBalance {
        available_cents: i64,
        requested_cents: i64,
    },

    #[error("Too many requests, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    pub fn conflict(message: impl Into<String>) -> Self {
        MarketError::Conflict(message.into())
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        MarketError::BadInput(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::Access(denied) => denied.kind(),
            MarketError::NotFound(_) => ErrorKind::NotFound,
            MarketError::BadInput(_) => ErrorKind::BadRequest,
            MarketError::Conflict(_) => ErrorKind::Conflict,
            MarketError::InsufficientBalance { .. } => ErrorKind::UnprocessableEntity,
            MarketError::RateLimited { .. } => ErrorKind::TooManyRequests,
            MarketError::Database(_) | MarketError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            MarketError::Database(_) | MarketError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            MarketError::RateLimited { .. } => {
                AppError::new(self.kind(), self.to_string()).with_action("Slow down and retry later")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            MarketError::Database(e) => {
                tracing::error!(error = %e, "Market database error");
            }
            MarketError::Internal(msg) => {
                tracing::error!(message = %msg, "Market internal error");
            }
            MarketError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Market rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Market error");
            }
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        self.log();
        let mut response = self.to_app_error().into_response();
        if let MarketError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<AppError> for MarketError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest | ErrorKind::UnprocessableEntity => {
                MarketError::BadInput(err.message().to_string())
            }
            _ => MarketError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_stays_distinct() {
        assert_eq!(MarketError::from(AccessDenied::Unauthenticated).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(MarketError::from(AccessDenied::Forbidden).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(MarketError::NotFound("Listing").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(MarketError::bad_input("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(MarketError::conflict("x").status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_id_becomes_bad_input() {
        let err: MarketError = AppError::bad_request("Invalid identifier: 0").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_errors_are_opaque() {
        let err = MarketError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.to_app_error().message(), "Internal server error");
    }
}
