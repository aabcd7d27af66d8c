//! Repository Traits
//!
//! One trait per aggregate. Status updates are compare-and-set: they take the
//! status the caller observed and return `false` when the stored record has
//! moved on since.

use chrono::{DateTime, Utc};
use kernel::pagination::Page;

use crate::domain::entity::{
    case::{Case, CaseMessage, CaseStatus, NewCase, NewCaseMessage},
    conversation::{Conversation, Message, NewMessage},
    listing::{Listing, ListingStatus, NewListing},
    notification::{NewNotification, Notification},
    order::{NewOrder, Order, OrderStatus},
    review::{NewReview, RatingSummary, Review},
    testimonial::{NewTestimonial, Testimonial, TestimonialStatus},
    withdrawal::{Balance, NewWithdrawal, Withdrawal, WithdrawalStatus},
};
use crate::domain::value_object::ids::{
    CaseId, ConversationId, ListingId, NotificationId, OrderId, ReviewId, TestimonialId, UserId,
    WithdrawalId,
};
use crate::error::MarketResult;

#[trait_variant::make(ListingRepository: Send)]
pub trait LocalListingRepository {
    async fn create_listing(&self, listing: &NewListing) -> MarketResult<Listing>;

    async fn find_listing(&self, id: ListingId) -> MarketResult<Option<Listing>>;

    /// Newest first; `None` lists every status
    async fn list_listings(&self, status: Option<ListingStatus>, page: Page) -> MarketResult<Vec<Listing>>;

    async fn list_listings_by_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Listing>>;

    /// Persist content and status if the stored status is still `expected`
    async fn update_listing(&self, listing: &Listing, expected: ListingStatus) -> MarketResult<bool>;

    /// Delete unless sold; `false` when nothing was removed
    async fn delete_listing(&self, id: ListingId) -> MarketResult<bool>;
}

#[trait_variant::make(OrderRepository: Send)]
pub trait LocalOrderRepository {
    /// Flip the listing from approved to sold and insert the order, atomically.
    /// `None` when the listing is no longer approved.
    async fn place_order(&self, order: &NewOrder) -> MarketResult<Option<Order>>;

    async fn find_order(&self, id: OrderId) -> MarketResult<Option<Order>>;

    /// Orders where the user is buyer or seller, newest first
    async fn list_orders_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Order>>;

    /// Persist status and tracking number if the stored status is still `expected`
    async fn update_order(&self, order: &Order, expected: OrderStatus) -> MarketResult<bool>;

    /// Cancel a placed order and put its listing back on sale, atomically
    async fn cancel_order(&self, order: &Order) -> MarketResult<bool>;
}

#[trait_variant::make(ConversationRepository: Send)]
pub trait LocalConversationRepository {
    /// Existing thread for (listing, buyer) or a new one
    async fn open_conversation(
        &self,
        listing_id: ListingId,
        buyer_id: UserId,
        seller_id: UserId,
    ) -> MarketResult<Conversation>;

    async fn find_conversation(&self, id: ConversationId) -> MarketResult<Option<Conversation>>;

    /// Most recently active first
    async fn list_conversations_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Conversation>>;

    async fn list_conversations(&self, page: Page) -> MarketResult<Vec<Conversation>>;

    async fn add_message(&self, message: &NewMessage) -> MarketResult<Message>;

    /// Oldest first
    async fn list_messages(&self, conversation_id: ConversationId) -> MarketResult<Vec<Message>>;
}

#[trait_variant::make(WithdrawalRepository: Send)]
pub trait LocalWithdrawalRepository {
    async fn balance(&self, seller_id: UserId) -> MarketResult<Balance>;

    /// Insert if the seller's available balance covers the amount, serialised
    /// per seller. `None` when it does not.
    async fn request_withdrawal(&self, withdrawal: &NewWithdrawal) -> MarketResult<Option<Withdrawal>>;

    async fn find_withdrawal(&self, id: WithdrawalId) -> MarketResult<Option<Withdrawal>>;

    async fn list_withdrawals_by_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Withdrawal>>;

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>, page: Page) -> MarketResult<Vec<Withdrawal>>;

    async fn update_withdrawal(&self, withdrawal: &Withdrawal, expected: WithdrawalStatus) -> MarketResult<bool>;
}

#[trait_variant::make(CaseRepository: Send)]
pub trait LocalCaseRepository {
    /// A second open case on the same order is a conflict
    async fn open_case(&self, case: &NewCase) -> MarketResult<Case>;

    async fn find_case(&self, id: CaseId) -> MarketResult<Option<Case>>;

    async fn list_cases_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Case>>;

    async fn list_cases(&self, status: Option<CaseStatus>, page: Page) -> MarketResult<Vec<Case>>;

    async fn update_case(&self, case: &Case, expected: CaseStatus) -> MarketResult<bool>;

    async fn add_case_message(&self, message: &NewCaseMessage) -> MarketResult<CaseMessage>;

    async fn list_case_messages(&self, case_id: CaseId) -> MarketResult<Vec<CaseMessage>>;
}

#[trait_variant::make(ReviewRepository: Send)]
pub trait LocalReviewRepository {
    /// One review per order; a duplicate is a conflict
    async fn create_review(&self, review: &NewReview) -> MarketResult<Review>;

    async fn find_review(&self, id: ReviewId) -> MarketResult<Option<Review>>;

    async fn list_reviews_for_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Review>>;

    async fn rating_summary(&self, seller_id: UserId) -> MarketResult<RatingSummary>;

    async fn delete_review(&self, id: ReviewId) -> MarketResult<bool>;
}

#[trait_variant::make(TestimonialRepository: Send)]
pub trait LocalTestimonialRepository {
    async fn create_testimonial(&self, testimonial: &NewTestimonial) -> MarketResult<Testimonial>;

    async fn find_testimonial(&self, id: TestimonialId) -> MarketResult<Option<Testimonial>>;

    async fn list_testimonials(&self, status: Option<TestimonialStatus>, page: Page) -> MarketResult<Vec<Testimonial>>;

    async fn update_testimonial(&self, testimonial: &Testimonial, expected: TestimonialStatus) -> MarketResult<bool>;

    async fn delete_testimonial(&self, id: TestimonialId) -> MarketResult<bool>;
}

#[trait_variant::make(NotificationRepository: Send)]
pub trait LocalNotificationRepository {
    async fn create_notification(&self, notification: &NewNotification) -> MarketResult<Notification>;

    async fn find_notification(&self, id: NotificationId) -> MarketResult<Option<Notification>>;

    async fn list_notifications(&self, recipient_id: UserId, unread_only: bool, page: Page) -> MarketResult<Vec<Notification>>;

    async fn unread_count(&self, recipient_id: UserId) -> MarketResult<i64>;

    /// No-op if already read
    async fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> MarketResult<()>;

    /// Returns how many were marked
    async fn mark_all_read(&self, recipient_id: UserId, at: DateTime<Utc>) -> MarketResult<u64>;
}

/// Everything the market handlers need from storage
pub trait MarketRepository:
    ListingRepository
    + OrderRepository
    + ConversationRepository
    + WithdrawalRepository
    + CaseRepository
    + ReviewRepository
    + TestimonialRepository
    + NotificationRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> MarketRepository for T where
    T: ListingRepository
        + OrderRepository
        + ConversationRepository
        + WithdrawalRepository
        + CaseRepository
        + ReviewRepository
        + TestimonialRepository
        + NotificationRepository
        + Send
        + Sync
        + 'static
{
}
