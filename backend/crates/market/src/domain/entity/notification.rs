use auth::ResourceOwners;
use chrono::{DateTime, Utc};

use crate::domain::value_object::ids::{NotificationId, UserId};

coded_enum! {
    NotificationKind {
        OrderPlaced => "ORDER_PLACED",
        OrderShipped => "ORDER_SHIPPED",
        OrderCompleted => "ORDER_COMPLETED",
        OrderCancelled => "ORDER_CANCELLED",
        OrderRefunded => "ORDER_REFUNDED",
        ListingApproved => "LISTING_APPROVED",
        ListingRejected => "LISTING_REJECTED",
        NewMessage => "NEW_MESSAGE",
        WithdrawalProcessed => "WITHDRAWAL_PROCESSED",
        CaseOpened => "CASE_OPENED",
        CaseMessage => "CASE_MESSAGE",
        CaseResolved => "CASE_RESOLVED",
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::owned_by(self.recipient_id)
    }
}
