//! Session extractor
//!
//! Any router state that can hand out the shared [`SessionStore`] through
//! `FromRef` gets `CurrentSession` for free. Extraction never rejects: a
//! request without a usable cookie is simply anonymous.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::application::session_store::SessionStore;
use crate::domain::entity::session::{Session, SessionUser};
use crate::domain::policy::AccessDenied;

#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl CurrentSession {
    /// Logged-in user or `Unauthenticated`
    pub fn require_user(&self) -> Result<&SessionUser, AccessDenied> {
        self.0.user().ok_or(AccessDenied::Unauthenticated)
    }
}

impl std::ops::Deref for CurrentSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    Arc<SessionStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Arc::<SessionStore>::from_ref(state);
        Ok(Self(store.resolve(&parts.headers)))
    }
}
