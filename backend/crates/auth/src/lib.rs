//! Auth (Authentication and Authorization) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Session, users, the authorization policy table, repository traits
//! - `application/` - Session store and use cases
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, session extractor, routers
//!
//! ## Security Model
//! - Sessions live entirely in an AES-256-GCM sealed cookie (no session table)
//! - An unreadable cookie degrades to an anonymous session, never to an error
//! - Passwords hashed with Argon2id
//! - Roles: `USER` and `ADMIN`; every protected action goes through
//!   [`domain::policy::authorize`]

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::{AuthConfig, SessionStore};
pub use domain::policy::{AccessDenied, Action, ResourceOwners, authorize};
pub use domain::value_object::user_id::UserId;
pub use domain::{Session, SessionUser};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryUserRepository, PgUserRepository};
pub use presentation::{AuthAppState, CurrentSession, admin_users_router, auth_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
