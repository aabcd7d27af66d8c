//! In-memory repository
//!
//! Backs tests and development runs without `DATABASE_URL`. One lock guards
//! every table, so the multi-record operations are atomic here too.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::pagination::Page;
use tokio::sync::RwLock;

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
use crate::domain::repository::{
    CaseRepository, ConversationRepository, ListingRepository, NotificationRepository,
    OrderRepository, ReviewRepository, TestimonialRepository, WithdrawalRepository,
};
use crate::domain::value_object::ids::{
    CaseId, ConversationId, ListingId, MessageId, NotificationId, OrderId, ReviewId,
    TestimonialId, UserId, WithdrawalId,
};
use crate::error::{MarketError, MarketResult};

/// Rows keyed by id with a monotonically increasing sequence
struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> T {
        self.next_id += 1;
        let row = build(self.next_id);
        self.rows.insert(self.next_id, row.clone());
        row
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    /// Newest first
    fn newest(&self) -> impl Iterator<Item = &T> {
        self.rows.values().rev()
    }
}

#[derive(Default)]
struct Inner {
    listings: Table<Listing>,
    orders: Table<Order>,
    conversations: Table<Conversation>,
    messages: Table<Message>,
    withdrawals: Table<Withdrawal>,
    cases: Table<Case>,
    case_messages: Table<CaseMessage>,
    reviews: Table<Review>,
    testimonials: Table<Testimonial>,
    notifications: Table<Notification>,
}

impl Inner {
    fn balance(&self, seller_id: UserId) -> Balance {
        let revenue = self
            .orders
            .rows
            .values()
            .filter(|o| o.seller_id == seller_id && o.status == OrderStatus::Completed)
            .map(|o| o.amount.get())
            .sum();
        let committed = self
            .withdrawals
            .rows
            .values()
            .filter(|w| w.seller_id == seller_id && w.status != WithdrawalStatus::Rejected)
            .map(|w| w.amount.get())
            .sum();
        Balance::new(revenue, committed)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMarketRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryMarketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListingRepository for InMemoryMarketRepository {
    async fn create_listing(&self, listing: &NewListing) -> MarketResult<Listing> {
        let now = Utc::now();
        Ok(self.inner.write().await.listings.insert_with(|id| Listing {
            id: ListingId::from_db(id),
            seller_id: listing.seller_id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price,
            status: ListingStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }))
    }

    async fn find_listing(&self, id: ListingId) -> MarketResult<Option<Listing>> {
        Ok(self.inner.read().await.listings.get(id.get()))
    }

    async fn list_listings(&self, status: Option<ListingStatus>, page: Page) -> MarketResult<Vec<Listing>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .listings
                .newest()
                .filter(|l| status.is_none_or(|s| l.status == s))
                .cloned(),
        ))
    }

    async fn list_listings_by_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Listing>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .listings
                .newest()
                .filter(|l| l.seller_id == seller_id)
                .cloned(),
        ))
    }

    async fn update_listing(&self, listing: &Listing, expected: ListingStatus) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.listings.rows.get_mut(&listing.id.get()) {
            Some(slot) if slot.status == expected => {
                *slot = listing.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_listing(&self, id: ListingId) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        let deletable = inner
            .listings
            .rows
            .get(&id.get())
            .is_some_and(|l| l.status != ListingStatus::Sold);
        if deletable {
            inner.listings.rows.remove(&id.get());
        }
        Ok(deletable)
    }
}

impl OrderRepository for InMemoryMarketRepository {
    async fn place_order(&self, order: &NewOrder) -> MarketResult<Option<Order>> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        match inner.listings.rows.get_mut(&order.listing_id.get()) {
            Some(listing) if listing.status == ListingStatus::Approved => {
                listing.status = ListingStatus::Sold;
                listing.updated_at = now;
            }
            _ => return Ok(None),
        }

        Ok(Some(inner.orders.insert_with(|id| Order {
            id: OrderId::from_db(id),
            listing_id: order.listing_id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            amount: order.amount,
            status: OrderStatus::Placed,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        })))
    }

    async fn find_order(&self, id: OrderId) -> MarketResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(id.get()))
    }

    async fn list_orders_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .orders
                .newest()
                .filter(|o| o.buyer_id == user_id || o.seller_id == user_id)
                .cloned(),
        ))
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.orders.rows.get_mut(&order.id.get()) {
            Some(slot) if slot.status == expected => {
                *slot = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_order(&self, order: &Order) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        match inner.orders.rows.get_mut(&order.id.get()) {
            Some(slot) if slot.status == OrderStatus::Placed => {
                slot.status = OrderStatus::Cancelled;
                slot.updated_at = now;
            }
            _ => return Ok(false),
        }
        if let Some(listing) = inner.listings.rows.get_mut(&order.listing_id.get()) {
            if listing.status == ListingStatus::Sold {
                listing.status = ListingStatus::Approved;
                listing.updated_at = now;
            }
        }
        Ok(true)
    }

}

impl ConversationRepository for InMemoryMarketRepository {
    async fn open_conversation(
        &self,
        listing_id: ListingId,
        buyer_id: UserId,
        seller_id: UserId,
    ) -> MarketResult<Conversation> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner
            .conversations
            .rows
            .values()
            .find(|c| c.listing_id == listing_id && c.buyer_id == buyer_id)
        {
            return Ok(existing.clone());
        }

        Ok(inner.conversations.insert_with(|id| Conversation {
            id: ConversationId::from_db(id),
            listing_id,
            buyer_id,
            seller_id,
            created_at: Utc::now(),
            last_message_at: None,
        }))
    }

    async fn find_conversation(&self, id: ConversationId) -> MarketResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(id.get()))
    }

    async fn list_conversations_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut mine: Vec<Conversation> = inner
            .conversations
            .rows
            .values()
            .filter(|c| c.buyer_id == user_id || c.seller_id == user_id)
            .cloned()
            .collect();
        mine.sort_by_key(|c| std::cmp::Reverse((last_activity(c), c.id)));
        Ok(page.apply(mine))
    }

    async fn list_conversations(&self, page: Page) -> MarketResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        Ok(page.apply(inner.conversations.newest().cloned()))
    }

    async fn add_message(&self, message: &NewMessage) -> MarketResult<Message> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let conversation = inner
            .conversations
            .rows
            .get_mut(&message.conversation_id.get())
            .ok_or(MarketError::NotFound("Conversation"))?;
        conversation.last_message_at = Some(now);

        Ok(inner.messages.insert_with(|id| Message {
            id: MessageId::from_db(id),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body.clone(),
            created_at: now,
        }))
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> MarketResult<Vec<Message>> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .rows
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

fn last_activity(conversation: &Conversation) -> DateTime<Utc> {
    conversation.last_message_at.unwrap_or(conversation.created_at)
}

impl WithdrawalRepository for InMemoryMarketRepository {
    async fn balance(&self, seller_id: UserId) -> MarketResult<Balance> {
        Ok(self.inner.read().await.balance(seller_id))
    }

    async fn request_withdrawal(&self, withdrawal: &NewWithdrawal) -> MarketResult<Option<Withdrawal>> {
        let mut inner = self.inner.write().await;
        if !inner.balance(withdrawal.seller_id).covers(withdrawal.amount) {
            return Ok(None);
        }

        Ok(Some(inner.withdrawals.insert_with(|id| Withdrawal {
            id: WithdrawalId::from_db(id),
            seller_id: withdrawal.seller_id,
            amount: withdrawal.amount,
            status: WithdrawalStatus::Pending,
            admin_note: None,
            created_at: Utc::now(),
            processed_at: None,
        })))
    }

    async fn find_withdrawal(&self, id: WithdrawalId) -> MarketResult<Option<Withdrawal>> {
        Ok(self.inner.read().await.withdrawals.get(id.get()))
    }

    async fn list_withdrawals_by_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Withdrawal>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .withdrawals
                .newest()
                .filter(|w| w.seller_id == seller_id)
                .cloned(),
        ))
    }

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>, page: Page) -> MarketResult<Vec<Withdrawal>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .withdrawals
                .newest()
                .filter(|w| status.is_none_or(|s| w.status == s))
                .cloned(),
        ))
    }

    async fn update_withdrawal(&self, withdrawal: &Withdrawal, expected: WithdrawalStatus) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.withdrawals.rows.get_mut(&withdrawal.id.get()) {
            Some(slot) if slot.status == expected => {
                *slot = withdrawal.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl CaseRepository for InMemoryMarketRepository {
    async fn open_case(&self, case: &NewCase) -> MarketResult<Case> {
        let mut inner = self.inner.write().await;
        if inner
            .cases
            .rows
            .values()
            .any(|c| c.order_id == case.order_id && c.status == CaseStatus::Open)
        {
            return Err(MarketError::conflict("A case is already open for this order"));
        }

        Ok(inner.cases.insert_with(|id| Case {
            id: CaseId::from_db(id),
            order_id: case.order_id,
            buyer_id: case.buyer_id,
            seller_id: case.seller_id,
            reason: case.reason.clone(),
            status: CaseStatus::Open,
            resolution: None,
            created_at: Utc::now(),
            resolved_at: None,
        }))
    }

    async fn find_case(&self, id: CaseId) -> MarketResult<Option<Case>> {
        Ok(self.inner.read().await.cases.get(id.get()))
    }

    async fn list_cases_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Case>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .cases
                .newest()
                .filter(|c| c.buyer_id == user_id || c.seller_id == user_id)
                .cloned(),
        ))
    }

    async fn list_cases(&self, status: Option<CaseStatus>, page: Page) -> MarketResult<Vec<Case>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .cases
                .newest()
                .filter(|c| status.is_none_or(|s| c.status == s))
                .cloned(),
        ))
    }

    async fn update_case(&self, case: &Case, expected: CaseStatus) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.cases.rows.get_mut(&case.id.get()) {
            Some(slot) if slot.status == expected => {
                *slot = case.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_case_message(&self, message: &NewCaseMessage) -> MarketResult<CaseMessage> {
        let mut inner = self.inner.write().await;
        if !inner.cases.rows.contains_key(&message.case_id.get()) {
            return Err(MarketError::NotFound("Case"));
        }

        Ok(inner.case_messages.insert_with(|id| CaseMessage {
            id: MessageId::from_db(id),
            case_id: message.case_id,
            author_id: message.author_id,
            body: message.body.clone(),
            created_at: Utc::now(),
        }))
    }

    async fn list_case_messages(&self, case_id: CaseId) -> MarketResult<Vec<CaseMessage>> {
        let inner = self.inner.read().await;
        Ok(inner
            .case_messages
            .rows
            .values()
            .filter(|m| m.case_id == case_id)
            .cloned()
            .collect())
    }
}

impl ReviewRepository for InMemoryMarketRepository {
    async fn create_review(&self, review: &NewReview) -> MarketResult<Review> {
        let mut inner = self.inner.write().await;
        if inner.reviews.rows.values().any(|r| r.order_id == review.order_id) {
            return Err(MarketError::conflict("This order has already been reviewed"));
        }

        Ok(inner.reviews.insert_with(|id| Review {
            id: ReviewId::from_db(id),
            order_id: review.order_id,
            author_id: review.author_id,
            seller_id: review.seller_id,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Utc::now(),
        }))
    }

    async fn find_review(&self, id: ReviewId) -> MarketResult<Option<Review>> {
        Ok(self.inner.read().await.reviews.get(id.get()))
    }

    async fn list_reviews_for_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .reviews
                .newest()
                .filter(|r| r.seller_id == seller_id)
                .cloned(),
        ))
    }

    async fn rating_summary(&self, seller_id: UserId) -> MarketResult<RatingSummary> {
        let inner = self.inner.read().await;
        let ratings: Vec<f64> = inner
            .reviews
            .rows
            .values()
            .filter(|r| r.seller_id == seller_id)
            .map(|r| f64::from(r.rating.get()))
            .collect();

        let count = ratings.len() as i64;
        let average = (count > 0).then(|| ratings.iter().sum::<f64>() / count as f64);
        Ok(RatingSummary { count, average })
    }

    async fn delete_review(&self, id: ReviewId) -> MarketResult<bool> {
        Ok(self.inner.write().await.reviews.rows.remove(&id.get()).is_some())
    }
}

impl TestimonialRepository for InMemoryMarketRepository {
    async fn create_testimonial(&self, testimonial: &NewTestimonial) -> MarketResult<Testimonial> {
        Ok(self.inner.write().await.testimonials.insert_with(|id| Testimonial {
            id: TestimonialId::from_db(id),
            author_id: testimonial.author_id,
            author_name: testimonial.author_name.clone(),
            body: testimonial.body.clone(),
            status: TestimonialStatus::Pending,
            created_at: Utc::now(),
        }))
    }

    async fn find_testimonial(&self, id: TestimonialId) -> MarketResult<Option<Testimonial>> {
        Ok(self.inner.read().await.testimonials.get(id.get()))
    }

    async fn list_testimonials(&self, status: Option<TestimonialStatus>, page: Page) -> MarketResult<Vec<Testimonial>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .testimonials
                .newest()
                .filter(|t| status.is_none_or(|s| t.status == s))
                .cloned(),
        ))
    }

    async fn update_testimonial(&self, testimonial: &Testimonial, expected: TestimonialStatus) -> MarketResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.testimonials.rows.get_mut(&testimonial.id.get()) {
            Some(slot) if slot.status == expected => {
                *slot = testimonial.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_testimonial(&self, id: TestimonialId) -> MarketResult<bool> {
        Ok(self.inner.write().await.testimonials.rows.remove(&id.get()).is_some())
    }
}

impl NotificationRepository for InMemoryMarketRepository {
    async fn create_notification(&self, notification: &NewNotification) -> MarketResult<Notification> {
        Ok(self.inner.write().await.notifications.insert_with(|id| Notification {
            id: NotificationId::from_db(id),
            recipient_id: notification.recipient_id,
            kind: notification.kind,
            message: notification.message.clone(),
            read_at: None,
            created_at: Utc::now(),
        }))
    }

    async fn find_notification(&self, id: NotificationId) -> MarketResult<Option<Notification>> {
        Ok(self.inner.read().await.notifications.get(id.get()))
    }

    async fn list_notifications(
        &self,
        recipient_id: UserId,
        unread_only: bool,
        page: Page,
    ) -> MarketResult<Vec<Notification>> {
        let inner = self.inner.read().await;
        Ok(page.apply(
            inner
                .notifications
                .newest()
                .filter(|n| n.recipient_id == recipient_id && (!unread_only || n.read_at.is_none()))
                .cloned(),
        ))
    }

    async fn unread_count(&self, recipient_id: UserId) -> MarketResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .notifications
            .rows
            .values()
            .filter(|n| n.recipient_id == recipient_id && n.read_at.is_none())
            .count() as i64)
    }

    async fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> MarketResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(n) = inner.notifications.rows.get_mut(&id.get()) {
            n.read_at.get_or_insert(at);
        }
        Ok(())
    }

    async fn mark_all_read(&self, recipient_id: UserId, at: DateTime<Utc>) -> MarketResult<u64> {
        let mut inner = self.inner.write().await;
        let mut marked = 0;
        for n in inner
            .notifications
            .rows
            .values_mut()
            .filter(|n| n.recipient_id == recipient_id && n.read_at.is_none())
        {
            n.read_at = Some(at);
            marked += 1;
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::money::Cents;

    fn seller() -> UserId {
        UserId::from_db(2)
    }

    async fn approved_listing(repo: &InMemoryMarketRepository) -> Listing {
        let mut listing = repo
            .create_listing(&NewListing {
                seller_id: seller(),
                title: "Road bike".into(),
                description: String::new(),
                price: Cents::from_db(20_000),
            })
            .await
            .unwrap();
        let previous = listing.approve().unwrap();
        assert!(repo.update_listing(&listing, previous).await.unwrap());
        listing
    }

    fn order_for(listing: &Listing) -> NewOrder {
        NewOrder {
            listing_id: listing.id,
            buyer_id: UserId::from_db(1),
            seller_id: listing.seller_id,
            amount: listing.price,
        }
    }

    #[tokio::test]
    async fn test_place_order_sells_listing_once() {
        let repo = InMemoryMarketRepository::new();
        let listing = approved_listing(&repo).await;

        let order = repo.place_order(&order_for(&listing)).await.unwrap();
        assert!(order.is_some());
        assert!(repo.place_order(&order_for(&listing)).await.unwrap().is_none());

        let stored = repo.find_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Sold);
    }

    #[tokio::test]
    async fn test_cancel_puts_listing_back() {
        let repo = InMemoryMarketRepository::new();
        let listing = approved_listing(&repo).await;
        let order = repo.place_order(&order_for(&listing)).await.unwrap().unwrap();

        assert!(repo.cancel_order(&order).await.unwrap());
        assert!(!repo.cancel_order(&order).await.unwrap());

        let stored = repo.find_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_is_compare_and_set() {
        let repo = InMemoryMarketRepository::new();
        let mut listing = approved_listing(&repo).await;

        listing.reject("Duplicate".into()).unwrap();
        assert!(!repo.update_listing(&listing, ListingStatus::Pending).await.unwrap());
        assert!(repo.update_listing(&listing, ListingStatus::Approved).await.unwrap());
    }

    #[tokio::test]
    async fn test_withdrawal_limited_by_completed_revenue() {
        let repo = InMemoryMarketRepository::new();
        let listing = approved_listing(&repo).await;
        let mut order = repo.place_order(&order_for(&listing)).await.unwrap().unwrap();

        let request = NewWithdrawal {
            seller_id: seller(),
            amount: Cents::from_db(5_000),
        };
        assert!(repo.request_withdrawal(&request).await.unwrap().is_none());

        let previous = order.ship(None).unwrap();
        repo.update_order(&order, previous).await.unwrap();
        let previous = order.confirm_receipt().unwrap();
        repo.update_order(&order, previous).await.unwrap();

        assert!(repo.request_withdrawal(&request).await.unwrap().is_some());
        let balance = repo.balance(seller()).await.unwrap();
        assert_eq!(balance, Balance::new(20_000, 5_000));
    }

    #[tokio::test]
    async fn test_single_open_case_per_order() {
        let repo = InMemoryMarketRepository::new();
        let case = NewCase {
            order_id: OrderId::from_db(1),
            buyer_id: UserId::from_db(1),
            seller_id: seller(),
            reason: "Not as described".into(),
        };
        let mut opened = repo.open_case(&case).await.unwrap();
        assert!(matches!(repo.open_case(&case).await, Err(MarketError::Conflict(_))));

        let previous = opened.resolve("Refunded".into()).unwrap();
        repo.update_case(&opened, previous).await.unwrap();
        assert!(repo.open_case(&case).await.is_ok());
    }

    #[tokio::test]
    async fn test_rating_summary() {
        let repo = InMemoryMarketRepository::new();
        assert_eq!(repo.rating_summary(seller()).await.unwrap(), RatingSummary::default());

        for (order, rating) in [(1, 5), (2, 4)] {
            repo.create_review(&NewReview {
                order_id: OrderId::from_db(order),
                author_id: UserId::from_db(1),
                seller_id: seller(),
                rating: crate::domain::entity::review::Rating::new(rating).unwrap(),
                comment: None,
            })
            .await
            .unwrap();
        }
        let summary = repo.rating_summary(seller()).await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(4.5));
    }
}
