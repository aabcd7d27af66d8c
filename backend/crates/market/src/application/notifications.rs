//! In-app notifications

use std::sync::Arc;

use auth::{Action, Session, authorize};
use chrono::Utc;
use kernel::pagination::Page;

use crate::application::guard::require_user;
use crate::domain::entity::notification::Notification;
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::NotificationId;
use crate::error::{MarketError, MarketResult};

pub struct NotificationService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
}

impl<R> NotificationService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Notifications plus the unread count
    pub async fn list_mine(
        &self,
        session: &Session,
        unread_only: bool,
        page: Page,
    ) -> MarketResult<(Vec<Notification>, i64)> {
        let user = require_user(session)?;
        let items = self.repo.list_notifications(user.id, unread_only, page).await?;
        let unread = self.repo.unread_count(user.id).await?;
        Ok((items, unread))
    }

    pub async fn mark_read(&self, session: &Session, id: NotificationId) -> MarketResult<()> {
        require_user(session)?;
        let notification = self
            .repo
            .find_notification(id)
            .await?
            .ok_or(MarketError::NotFound("Notification"))?;
        authorize(session, Action::NotificationRead, Some(&notification.owners()))?;

        self.repo.mark_read(id, Utc::now()).await
    }

    pub async fn mark_all_read(&self, session: &Session) -> MarketResult<u64> {
        let user = require_user(session)?;
        let marked = self.repo.mark_all_read(user.id, Utc::now()).await?;
        tracing::debug!(user_id = %user.id, marked, "Notifications marked read");
        Ok(marked)
    }
}
