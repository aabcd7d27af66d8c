//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infrastructure layer.

use kernel::pagination::Page;

use crate::domain::entity::user::{NewUser, User};
use crate::domain::value_object::{email::Email, user_id::UserId};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a new account; a duplicate email is `AuthError::EmailTaken`
    async fn create(&self, user: &NewUser) -> AuthResult<User>;

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Newest first
    async fn list(&self, page: Page) -> AuthResult<Vec<User>>;

    /// Persist role, ban flag and profile changes
    async fn update(&self, user: &User) -> AuthResult<()>;
}
