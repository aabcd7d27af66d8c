//! Deferred request extractors
//!
//! axum rejects a bad path segment or query string before the handler body
//! runs, with a plain-text response. These extractors only capture the raw
//! input, so a handler can check the caller first and parse afterwards with
//! the same problem body as every other error.

use std::marker::PhantomData;

use axum::extract::{FromRequestParts, Path, Query};
use axum::http::{Uri, request::Parts};
use serde::de::DeserializeOwned;

use crate::error::app_error::{AppError, AppResult};
use crate::id::Id;

/// Raw `{id}` path segment, parsed on demand into a typed [`Id`]
#[derive(Debug, Clone)]
pub struct PathId(pub String);

impl PathId {
    pub fn parse<T>(&self) -> AppResult<Id<T>> {
        self.0.parse()
    }
}

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        Ok(Self(raw))
    }
}

/// Query string kept unparsed until [`get`](Self::get) is called
pub struct Params<T> {
    uri: Uri,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Params<T> {
    pub fn get(&self) -> AppResult<T> {
        let Query(value) =
            Query::<T>::try_from_uri(&self.uri).map_err(|e| AppError::bad_request(e.body_text()))?;
        Ok(value)
    }
}

impl<T, S> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            uri: parts.uri.clone(),
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PageQuery;

    struct Listing;

    fn params(uri: &'static str) -> Params<PageQuery> {
        Params {
            uri: Uri::from_static(uri),
            _marker: PhantomData,
        }
    }

    #[test]
    fn test_path_id_parses_lazily() {
        let id = PathId("42".to_string()).parse::<Listing>().unwrap();
        assert_eq!(id.get(), 42);

        assert_eq!(PathId("abc".into()).parse::<Listing>().unwrap_err().status_code(), 400);
        assert_eq!(PathId("0".into()).parse::<Listing>().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_params_get() {
        let query = params("/api/listings?page=3&perPage=10").get().unwrap();
        assert_eq!(query.page, Some(3));
        assert_eq!(query.per_page, Some(10));

        let empty = params("/api/listings").get().unwrap();
        assert!(empty.page.is_none());
    }

    #[test]
    fn test_params_rejection_is_bad_request() {
        let err = params("/api/listings?page=-1").get().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
