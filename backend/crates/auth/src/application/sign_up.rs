//! Sign Up Use Case
//!
//! Creates a new account and signs it in.

use std::sync::Arc;

use platform::client::ClientIdentity;
use platform::password::ClearTextPassword;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::AuthConfig;
use crate::domain::entity::{session::SessionUser, user::NewUser};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{display_name::DisplayName, email::Email, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

pub struct SignUpUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    limiter: Arc<FixedWindowRateLimiter>,
    config: Arc<AuthConfig>,
}

impl<U> SignUpUseCase<U>
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

    pub async fn execute(&self, input: SignUpInput, client: &ClientIdentity) -> AuthResult<SessionUser> {
        let limit = self
            .limiter
            .check(&client.rate_limit_key("register"), &self.config.register_rate_limit);
        if !limit.allowed {
            return Err(AuthError::RateLimited {
                retry_after_secs: limit.retry_after_secs(self.limiter.now_ms()),
            });
        }

        let email = Email::new(&input.email)?;
        let name = DisplayName::parse(input.name)?.map(DisplayName::into_inner);
        let password = ClearTextPassword::new(input.password)?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = password
            .hash(self.config.pepper())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user = self
            .user_repo
            .create(&NewUser {
                email,
                name,
                password_hash,
                role: UserRole::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email.masked(), "User signed up");

        Ok(user.session_user())
    }
}
