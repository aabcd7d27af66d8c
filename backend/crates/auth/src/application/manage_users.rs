//! Admin user management
//!
//! Every operation is gated on [`Action::UserManage`].

use std::sync::Arc;

use kernel::pagination::Page;

use crate::domain::entity::{session::Session, user::User};
use crate::domain::policy::{Action, authorize};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{user_id::UserId, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

pub struct ManageUsersUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> ManageUsersUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn list(&self, session: &Session, page: Page) -> AuthResult<Vec<User>> {
        authorize(session, Action::UserManage, None)?;
        self.user_repo.list(page).await
    }

    pub async fn change_role(&self, session: &Session, id: UserId, role: UserRole) -> AuthResult<User> {
        let admin = authorize(session, Action::UserManage, None)?;
        let mut user = self.load(id).await?;

        if user.role != role {
            user.set_role(role);
            self.user_repo.update(&user).await?;
            tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %role, "User role changed");
        }

        Ok(user)
    }

    pub async fn ban(&self, session: &Session, id: UserId) -> AuthResult<User> {
        let admin = authorize(session, Action::UserManage, None)?;
        if admin.id == id {
            return Err(AuthError::BadInput("You cannot ban yourself".to_string()));
        }
        self.set_banned(admin.id, id, true).await
    }

    pub async fn unban(&self, session: &Session, id: UserId) -> AuthResult<User> {
        let admin = authorize(session, Action::UserManage, None)?;
        self.set_banned(admin.id, id, false).await
    }

    async fn set_banned(&self, admin_id: UserId, id: UserId, banned: bool) -> AuthResult<User> {
        let mut user = self.load(id).await?;

        if user.banned != banned {
            user.set_banned(banned);
            self.user_repo.update(&user).await?;
            tracing::info!(admin_id = %admin_id, user_id = %user.id, banned, "User ban status changed");
        }

        Ok(user)
    }

    async fn load(&self, id: UserId) -> AuthResult<User> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
