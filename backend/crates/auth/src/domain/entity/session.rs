//! Session
//!
//! The identity claim carried in the sealed session cookie. There is no
//! server-side session record: the cookie is the session.

use serde::{Deserialize, Serialize};

use crate::domain::value_object::{user_id::UserId, user_role::UserRole};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: UserRole,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn authenticated(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_json_shape() {
        let session = Session::authenticated(SessionUser {
            id: UserId::from_db(4),
            email: "a@b.fr".into(),
            name: None,
            role: UserRole::Admin,
        });
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "user": { "id": 4, "email": "a@b.fr", "name": null, "role": "ADMIN" } })
        );
    }

    #[test]
    fn test_empty_object_is_anonymous() {
        let session: Session = serde_json::from_str("{}").unwrap();
        assert_eq!(session, Session::anonymous());
        assert!(!session.is_authenticated());
    }
}
