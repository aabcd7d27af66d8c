//! Request body extractor
//!
//! Like `Json<T>`, but a malformed body is a `BadInput` problem response
//! and an empty body deserialises as `T::default()`, so endpoints whose
//! payload is entirely optional accept a bare POST.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::MarketError;

#[derive(Debug, Clone, Default)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = MarketError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| MarketError::bad_input(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes)
            .map_err(|e| MarketError::bad_input(e.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Probe {
        name: Option<String>,
    }

    async fn extract(body: &'static str) -> Result<Payload<Probe>, MarketError> {
        let req = Request::builder().body(Body::from(body)).unwrap();
        Payload::<Probe>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_empty_body_is_default() {
        assert!(extract("").await.unwrap().0.name.is_none());
    }

    #[tokio::test]
    async fn test_valid_body() {
        let Payload(probe) = extract(r#"{"name":"bike"}"#).await.unwrap();
        assert_eq!(probe.name.as_deref(), Some("bike"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_input() {
        assert!(matches!(extract("{nope").await, Err(MarketError::BadInput(_))));
        assert!(matches!(extract(r#"{"name":42}"#).await, Err(MarketError::BadInput(_))));
    }
}
