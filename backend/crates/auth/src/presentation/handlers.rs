//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRef, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use kernel::extract::{Params, PathId};
use kernel::pagination::PageQuery;
use platform::client::ClientIdentity;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::{
    AuthConfig, ManageUsersUseCase, SessionStatus, SessionStore, SignInInput, SignInUseCase,
    SignUpInput, SignUpUseCase,
};
use crate::domain::entity::session::Session;
use crate::domain::policy::{Action, authorize};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_id::UserId;
use crate::error::AuthResult;
use crate::presentation::dto::{ChangeRoleRequest, LoginRequest, RegisterRequest, UserResponse};
use crate::presentation::extractor::CurrentSession;

/// Shared state for auth handlers
pub struct AuthAppState<U> {
    pub users: Arc<U>,
    pub config: Arc<AuthConfig>,
    pub sessions: Arc<SessionStore>,
    pub limiter: Arc<FixedWindowRateLimiter>,
}

impl<U> AuthAppState<U> {
    pub fn new(
        users: U,
        config: Arc<AuthConfig>,
        sessions: Arc<SessionStore>,
        limiter: Arc<FixedWindowRateLimiter>,
    ) -> Self {
        Self {
            users: Arc::new(users),
            config,
            sessions,
            limiter,
        }
    }
}

impl<U> Clone for AuthAppState<U> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            config: self.config.clone(),
            sessions: self.sessions.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

impl<U> FromRef<AuthAppState<U>> for Arc<SessionStore> {
    fn from_ref(state: &AuthAppState<U>) -> Self {
        state.sessions.clone()
    }
}

// ============================================================================
// Register / Login / Logout
// ============================================================================

/// POST /api/auth/register
pub async fn register<U>(
    State(state): State<AuthAppState<U>>,
    client: ClientIdentity,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse>
where
    U: UserRepository + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.users.clone(), state.limiter.clone(), state.config.clone());

    let input = SignUpInput {
        email: req.email,
        password: req.password,
        name: req.name,
    };
    let user = use_case.execute(input, &client).await?;

    let session = Session::authenticated(user);
    let cookie = state.sessions.save_cookie(&session)?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SessionStatus::from(&session)),
    ))
}

/// POST /api/auth/login
pub async fn login<U>(
    State(state): State<AuthAppState<U>>,
    client: ClientIdentity,
    Json(req): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse>
where
    U: UserRepository + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(state.users.clone(), state.limiter.clone(), state.config.clone());

    let input = SignInInput {
        email: req.email,
        password: req.password,
    };
    let user = use_case.execute(input, &client).await?;

    let session = Session::authenticated(user);
    let cookie = state.sessions.save_cookie(&session)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SessionStatus::from(&session)),
    ))
}

/// POST /api/auth/logout
pub async fn logout<U>(State(state): State<AuthAppState<U>>) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
    )
}

/// GET /api/auth/session
pub async fn session_status(session: CurrentSession) -> Json<SessionStatus> {
    Json(SessionStatus::from(&session.0))
}

// ============================================================================
// Admin: users
// ============================================================================

/// GET /api/admin/users
pub async fn list_users<U>(
    State(state): State<AuthAppState<U>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> AuthResult<Json<Vec<UserResponse>>>
where
    U: UserRepository + Send + Sync + 'static,
{
    authorize(&session, Action::UserManage, None)?;
    let page = query.get()?.resolve(state.config.max_page_size);

    let use_case = ManageUsersUseCase::new(state.users.clone());
    let users = use_case.list(&session, page).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// PATCH /api/admin/users/{id}/role
pub async fn change_role<U>(
    State(state): State<AuthAppState<U>>,
    session: CurrentSession,
    id: PathId,
    Json(req): Json<ChangeRoleRequest>,
) -> AuthResult<Json<UserResponse>>
where
    U: UserRepository + Send + Sync + 'static,
{
    authorize(&session, Action::UserManage, None)?;
    let id: UserId = id.parse()?;
    let role = req.parse()?;

    let use_case = ManageUsersUseCase::new(state.users.clone());
    let user = use_case.change_role(&session, id, role).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/{id}/ban
pub async fn ban_user<U>(
    State(state): State<AuthAppState<U>>,
    session: CurrentSession,
    id: PathId,
) -> AuthResult<Json<UserResponse>>
where
    U: UserRepository + Send + Sync + 'static,
{
    authorize(&session, Action::UserManage, None)?;
    let id: UserId = id.parse()?;

    let use_case = ManageUsersUseCase::new(state.users.clone());
    let user = use_case.ban(&session, id).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/{id}/unban
pub async fn unban_user<U>(
    State(state): State<AuthAppState<U>>,
    session: CurrentSession,
    id: PathId,
) -> AuthResult<Json<UserResponse>>
where
    U: UserRepository + Send + Sync + 'static,
{
    authorize(&session, Action::UserManage, None)?;
    let id: UserId = id.parse()?;

    let use_case = ManageUsersUseCase::new(state.users.clone());
    let user = use_case.unban(&session, id).await?;
    Ok(Json(user.into()))
}
