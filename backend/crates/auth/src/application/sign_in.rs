//! Sign In Use Case
//!
//! Verifies credentials and returns the identity to store in the session.

use std::sync::Arc;

use platform::client::ClientIdentity;
use platform::password::ClearTextPassword;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::AuthConfig;
use crate::domain::entity::session::SessionUser;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct SignInInput {
    pub email: String,
    pub password: String,
}

pub struct SignInUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    limiter: Arc<FixedWindowRateLimiter>,
    config: Arc<AuthConfig>,
}

impl<U> SignInUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, limiter: Arc<FixedWindowRateLimiter>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            limiter,
            config,
        }
    }

    pub async fn execute(&self, input: SignInInput, client: &ClientIdentity) -> AuthResult<SessionUser> {
        let limit = self
            .limiter
            .check(&client.rate_limit_key("login"), &self.config.login_rate_limit);
        if !limit.allowed {
            return Err(AuthError::RateLimited {
                retry_after_secs: limit.retry_after_secs(self.limiter.now_ms()),
            });
        }

        // A malformed email cannot belong to anyone
        let email = Email::new(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password = ClearTextPassword::for_verification(input.password);
        if !user.password_hash.verify(&password, self.config.pepper()) {
            return Err(AuthError::InvalidCredentials);
        }

        // Checked after the password so a ban does not reveal the account exists
        if !user.can_login() {
            return Err(AuthError::AccountBanned);
        }

        tracing::info!(user_id = %user.id, role = %user.role, "User signed in");

        Ok(user.session_user())
    }
}
