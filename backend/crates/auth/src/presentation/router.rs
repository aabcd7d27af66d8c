//! Auth Router

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::domain::repository::UserRepository;
use crate::presentation::handlers::{self, AuthAppState};

/// Routes mounted under `/api/auth`
pub fn auth_router<U>(state: AuthAppState<U>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/register", post(handlers::register::<U>))
        .route("/login", post(handlers::login::<U>))
        .route("/logout", post(handlers::logout::<U>))
        .route("/session", get(handlers::session_status))
        .with_state(state)
}

/// Admin user management, mounted under `/api/admin`
pub fn admin_users_router<U>(state: AuthAppState<U>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/users", get(handlers::list_users::<U>))
        .route("/users/{id}/role", patch(handlers::change_role::<U>))
        .route("/users/{id}/ban", post(handlers::ban_user::<U>))
        .route("/users/{id}/unban", post(handlers::unban_user::<U>))
        .with_state(state)
}
