//! Buyer/seller conversations about a listing

use std::sync::Arc;

use auth::{Action, Session, authorize};
use kernel::pagination::Page;
use platform::client::ClientIdentity;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::MarketConfig;
use crate::application::guard::{enforce_rate_limit, notify, require_user};
use crate::domain::entity::conversation::{Conversation, Message, NewMessage};
use crate::domain::entity::notification::NotificationKind;
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::{ConversationId, ListingId};
use crate::error::{MarketError, MarketResult};

pub struct ConversationService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
    limiter: Arc<FixedWindowRateLimiter>,
    config: Arc<MarketConfig>,
}

impl<R> ConversationService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>, limiter: Arc<FixedWindowRateLimiter>, config: Arc<MarketConfig>) -> Self {
        Self {
            repo,
            limiter,
            config,
        }
    }

    /// Contact the seller of a public listing
    pub async fn open(&self, session: &Session, listing_id: ListingId) -> MarketResult<Conversation> {
        let buyer = authorize(session, Action::ConversationOpen, None)?;
        let listing = self
            .repo
            .find_listing(listing_id)
            .await?
            .filter(|l| l.is_public())
            .ok_or(MarketError::NotFound("Listing"))?;

        if listing.seller_id == buyer.id {
            return Err(MarketError::bad_input("You cannot message yourself about your own listing"));
        }

        self.repo
            .open_conversation(listing_id, buyer.id, listing.seller_id)
            .await
    }

    pub async fn list_mine(&self, session: &Session, page: Page) -> MarketResult<Vec<Conversation>> {
        let user = require_user(session)?;
        self.repo.list_conversations_for_user(user.id, page).await
    }

    pub async fn get(&self, session: &Session, id: ConversationId) -> MarketResult<(Conversation, Vec<Message>)> {
        require_user(session)?;
        let conversation = self.load(id).await?;
        authorize(session, Action::ConversationView, Some(&conversation.owners()))?;

        let messages = self.repo.list_messages(id).await?;
        Ok((conversation, messages))
    }

    pub async fn post(
        &self,
        session: &Session,
        client: &ClientIdentity,
        id: ConversationId,
        body: String,
    ) -> MarketResult<Message> {
        require_user(session)?;
        let conversation = self.load(id).await?;
        let sender = authorize(session, Action::ConversationPost, Some(&conversation.owners()))?;
        enforce_rate_limit(
            &self.limiter,
            &client.rate_limit_key("message"),
            &self.config.message_rate_limit,
        )?;

        let message = self
            .repo
            .add_message(&NewMessage {
                conversation_id: id,
                sender_id: sender.id,
                body,
            })
            .await?;

        tracing::debug!(conversation_id = %id, sender_id = %sender.id, "Message posted");
        notify(
            &*self.repo,
            conversation.counterpart(sender.id),
            NotificationKind::NewMessage,
            format!("New message in conversation #{id}"),
        )
        .await;
        Ok(message)
    }

    pub async fn admin_list(&self, session: &Session, page: Page) -> MarketResult<Vec<Conversation>> {
        authorize(session, Action::ConversationModerate, None)?;
        self.repo.list_conversations(page).await
    }

    async fn load(&self, id: ConversationId) -> MarketResult<Conversation> {
        self.repo
            .find_conversation(id)
            .await?
            .ok_or(MarketError::NotFound("Conversation"))
    }
}
