//! In-memory repository
//!
//! Backs tests and development runs without `DATABASE_URL`. Contents are lost
//! on restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use kernel::pagination::Page;
use tokio::sync::RwLock;

use crate::domain::entity::user::{NewUser, User};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, user_id::UserId};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &NewUser) -> AuthResult<User> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::from_db(inner.next_id),
            email: user.email.clone(),
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            banned: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(created.id.get(), created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id.get()).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn list(&self, page: Page) -> AuthResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(page.apply(inner.users.values().rev().cloned()))
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .users
            .get_mut(&user.id.get())
            .ok_or(AuthError::UserNotFound)?;
        *slot = user.clone();
        Ok(())
    }
}
