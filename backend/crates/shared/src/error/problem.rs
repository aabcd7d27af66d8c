//! RFC 7807 problem responses

#[cfg(feature = "axum")]
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[cfg(feature = "axum")]
use super::app_error::AppError;

/// `type` URI of a problem body
pub fn problem_type(status: u16) -> String {
    format!("https://httpstatuses.io/{status}")
}

#[cfg(feature = "axum")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "type": problem_type(self.status_code()),
            "title": self.kind().as_str(),
            "status": self.status_code(),
            "detail": self.message(),
            "action": self.action(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(all(test, feature = "axum"))]
mod tests {
    use super::*;
    use crate::error::kind::ErrorKind;
    use axum::http::header;

    #[test]
    fn test_status_and_content_type() {
        let response = AppError::new(ErrorKind::Conflict, "Listing is already sold").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_internal_error_status() {
        let response = AppError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

#[cfg(test)]
mod type_tests {
    use super::problem_type;

    #[test]
    fn test_problem_type_uri() {
        assert_eq!(problem_type(404), "https://httpstatuses.io/404");
    }
}
