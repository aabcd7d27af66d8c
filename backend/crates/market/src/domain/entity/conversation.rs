use auth::ResourceOwners;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_object::ids::{ConversationId, ListingId, MessageId, UserId};

/// Buyer/seller thread about one listing (one per buyer and listing)
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: ConversationId,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::trade(self.buyer_id, self.seller_id)
    }

    pub fn counterpart(&self, user_id: UserId) -> UserId {
        if user_id == self.buyer_id {
            self.seller_id
        } else {
            self.buyer_id
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: String,
}
