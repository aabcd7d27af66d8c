//! User Entity

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;

use crate::domain::entity::session::SessionUser;
use crate::domain::value_object::{email::Email, user_id::UserId, user_role::UserRole};

/// Persisted account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub password_hash: HashedPassword,
    pub role: UserRole,
    /// Banned accounts cannot log in
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account about to be inserted (id assigned by storage)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: Option<String>,
    pub password_hash: HashedPassword,
    pub role: UserRole,
}

impl User {
    /// Identity claim carried in the session cookie
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            email: self.email.as_str().to_string(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    pub fn can_login(&self) -> bool {
        !self.banned
    }

    pub fn set_role(&mut self, role: UserRole) {
        self.role = role;
        self.updated_at = Utc::now();
    }

    pub fn set_banned(&mut self, banned: bool) {
        self.banned = banned;
        self.updated_at = Utc::now();
    }
}
