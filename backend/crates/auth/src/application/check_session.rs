//! Session status

use serde::Serialize;

use crate::domain::entity::session::{Session, SessionUser};

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<SessionUser>,
}

impl From<&Session> for SessionStatus {
    fn from(session: &Session) -> Self {
        Self {
            authenticated: session.is_authenticated(),
            user: session.user.clone(),
        }
    }
}
