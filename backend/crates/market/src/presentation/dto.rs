//! API DTOs (Data Transfer Objects)
//!
//! Requests are shaped into typed inputs before they reach a service; every
//! field a client can omit is optional here so that a missing field is
//! reported as a validation error.

use chrono::{DateTime, Utc};
use kernel::pagination::{Page, PageQuery};
use serde::{Deserialize, Serialize};

use crate::application::ListingDraft;
use crate::domain::entity::{
    case::{Case, CaseMessage, CaseStatus},
    conversation::{Conversation, Message},
    listing::{Listing, ListingChanges, ListingStatus},
    notification::{Notification, NotificationKind},
    order::{Order, OrderStatus},
    review::{Rating, RatingSummary, Review},
    testimonial::{Testimonial, TestimonialStatus},
    withdrawal::{Withdrawal, WithdrawalStatus},
};
use crate::domain::value_object::ids::{ListingId, OrderId};
use crate::domain::value_object::money::Cents;
use crate::domain::value_object::text;
use crate::error::{MarketError, MarketResult};

const TITLE_MAX: usize = 120;
const DESCRIPTION_MAX: usize = 5_000;
const MESSAGE_MAX: usize = 2_000;
const NOTE_MAX: usize = 500;
const COMMENT_MAX: usize = 1_000;
const TESTIMONIAL_MAX: usize = 1_000;
const TRACKING_MAX: usize = 64;

fn required<T>(field: &str, value: Option<T>) -> MarketResult<T> {
    value.ok_or_else(|| MarketError::bad_input(format!("{field} is required")))
}

// ============================================================================
// Queries
// ============================================================================

/// `?status=PENDING&page=1&perPage=20` on admin lists
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl StatusQuery {
    pub fn status<T>(&self, parse: fn(&str) -> Option<T>) -> MarketResult<Option<T>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(code) => parse(&code.to_ascii_uppercase())
                .map(Some)
                .ok_or_else(|| MarketError::bad_input(format!("Unknown status: {code}"))),
        }
    }

    pub fn page(&self, max_per_page: u32) -> Page {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
        .resolve(max_per_page)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl NotificationQuery {
    pub fn page(&self, max_per_page: u32) -> Page {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
        .resolve(max_per_page)
    }
}

// ============================================================================
// Listings
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

impl CreateListingRequest {
    pub fn validate(self) -> MarketResult<ListingDraft> {
        let title = text::bounded("Title", &required("Title", self.title)?, 3, TITLE_MAX)?;
        let description = text::bounded(
            "Description",
            self.description.as_deref().unwrap_or_default(),
            0,
            DESCRIPTION_MAX,
        )?;
        let price = Cents::new(required("Price", self.price_cents)?)?;

        Ok(ListingDraft {
            title,
            description,
            price,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

impl UpdateListingRequest {
    pub fn validate(self) -> MarketResult<ListingChanges> {
        if self.title.is_none() && self.description.is_none() && self.price_cents.is_none() {
            return Err(MarketError::bad_input("Nothing to update"));
        }

        Ok(ListingChanges {
            title: self
                .title
                .map(|t| text::bounded("Title", &t, 3, TITLE_MAX))
                .transpose()?,
            description: self
                .description
                .map(|d| text::bounded("Description", &d, 0, DESCRIPTION_MAX))
                .transpose()?,
            price: self.price_cents.map(Cents::new).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: i64,
    pub seller_id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub status: ListingStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Listing> for ListingResponse {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id.get(),
            seller_id: l.seller_id.get(),
            title: l.title,
            description: l.description,
            price_cents: l.price.get(),
            status: l.status,
            rejection_reason: l.rejection_reason,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

// ============================================================================
// Free text payloads shared by moderation endpoints
// ============================================================================

/// `{ "reason": "..." }` for listing rejection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

impl ReasonRequest {
    pub fn validate(self) -> MarketResult<String> {
        text::bounded("Reason", &required("Reason", self.reason)?, 1, NOTE_MAX)
    }
}

/// `{ "note": "..." }` for withdrawal processing; optional on approval
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteRequest {
    pub note: Option<String>,
}

impl NoteRequest {
    pub fn optional(self) -> MarketResult<Option<String>> {
        text::optional("Note", self.note.as_deref(), NOTE_MAX)
    }

    pub fn required(self) -> MarketResult<String> {
        text::bounded("Note", &required("Note", self.note)?, 1, NOTE_MAX)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolutionRequest {
    pub resolution: Option<String>,
}

impl ResolutionRequest {
    pub fn validate(self) -> MarketResult<String> {
        text::bounded("Resolution", &required("Resolution", self.resolution)?, 1, MESSAGE_MAX)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRequest {
    pub body: Option<String>,
}

impl MessageRequest {
    pub fn validate(self) -> MarketResult<String> {
        text::bounded("Message", &required("Message", self.body)?, 1, MESSAGE_MAX)
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub listing_id: Option<i64>,
}

impl PlaceOrderRequest {
    pub fn validate(self) -> MarketResult<ListingId> {
        Ok(ListingId::new(required("Listing id", self.listing_id)?)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRequest {
    pub tracking_number: Option<String>,
}

impl ShipRequest {
    pub fn validate(self) -> MarketResult<Option<String>> {
        text::optional("Tracking number", self.tracking_number.as_deref(), TRACKING_MAX)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub listing_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub amount_cents: i64,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id.get(),
            listing_id: o.listing_id.get(),
            buyer_id: o.buyer_id.get(),
            seller_id: o.seller_id.get(),
            amount_cents: o.amount.get(),
            status: o.status,
            tracking_number: o.tracking_number,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

// ============================================================================
// Conversations
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    pub listing_id: Option<i64>,
}

impl OpenConversationRequest {
    pub fn validate(self) -> MarketResult<ListingId> {
        Ok(ListingId::new(required("Listing id", self.listing_id)?)?)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: i64,
    pub listing_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id.get(),
            listing_id: c.listing_id.get(),
            buyer_id: c.buyer_id.get(),
            seller_id: c.seller_id.get(),
            created_at: c.created_at,
            last_message_at: c.last_message_at,
            messages: None,
        }
    }
}

impl ConversationResponse {
    pub fn with_messages(conversation: Conversation, messages: Vec<Message>) -> Self {
        Self {
            messages: Some(messages),
            ..conversation.into()
        }
    }
}

// ============================================================================
// Withdrawals
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub amount_cents: Option<i64>,
}

impl WithdrawalRequest {
    pub fn validate(self) -> MarketResult<Cents> {
        Cents::new(required("Amount", self.amount_cents)?)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub id: i64,
    pub seller_id: i64,
    pub amount_cents: i64,
    pub status: WithdrawalStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self {
            id: w.id.get(),
            seller_id: w.seller_id.get(),
            amount_cents: w.amount.get(),
            status: w.status,
            admin_note: w.admin_note,
            created_at: w.created_at,
            processed_at: w.processed_at,
        }
    }
}

// ============================================================================
// Cases
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCaseRequest {
    pub order_id: Option<i64>,
    pub reason: Option<String>,
}

impl OpenCaseRequest {
    pub fn validate(self) -> MarketResult<(OrderId, String)> {
        let order_id = OrderId::new(required("Order id", self.order_id)?)?;
        let reason = text::bounded("Reason", &required("Reason", self.reason)?, 5, MESSAGE_MAX)?;
        Ok((order_id, reason))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResponse {
    pub id: i64,
    pub order_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub reason: String,
    pub status: CaseStatus,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<CaseMessage>>,
}

impl From<Case> for CaseResponse {
    fn from(c: Case) -> Self {
        Self {
            id: c.id.get(),
            order_id: c.order_id.get(),
            buyer_id: c.buyer_id.get(),
            seller_id: c.seller_id.get(),
            reason: c.reason,
            status: c.status,
            resolution: c.resolution,
            created_at: c.created_at,
            resolved_at: c.resolved_at,
            messages: None,
        }
    }
}

impl CaseResponse {
    pub fn with_messages(case: Case, messages: Vec<CaseMessage>) -> Self {
        Self {
            messages: Some(messages),
            ..case.into()
        }
    }
}

// ============================================================================
// Reviews
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub order_id: Option<i64>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

pub struct ReviewInput {
    pub order_id: OrderId,
    pub rating: Rating,
    pub comment: Option<String>,
}

impl CreateReviewRequest {
    pub fn validate(self) -> MarketResult<ReviewInput> {
        Ok(ReviewInput {
            order_id: OrderId::new(required("Order id", self.order_id)?)?,
            rating: Rating::new(required("Rating", self.rating)?)?,
            comment: text::optional("Comment", self.comment.as_deref(), COMMENT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: i64,
    pub order_id: i64,
    pub author_id: i64,
    pub seller_id: i64,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id.get(),
            order_id: r.order_id.get(),
            author_id: r.author_id.get(),
            seller_id: r.seller_id.get(),
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerReviewsResponse {
    pub summary: RatingSummary,
    pub reviews: Vec<ReviewResponse>,
}

// ============================================================================
// Testimonials
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestimonialRequest {
    pub body: Option<String>,
}

impl TestimonialRequest {
    pub fn validate(self) -> MarketResult<String> {
        text::bounded("Testimonial", &required("Testimonial", self.body)?, 10, TESTIMONIAL_MAX)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialResponse {
    pub id: i64,
    pub author_name: String,
    pub body: String,
    pub status: TestimonialStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Testimonial> for TestimonialResponse {
    fn from(t: Testimonial) -> Self {
        Self {
            id: t.id.get(),
            author_name: t.author_name,
            body: t.body,
            status: t.status,
            created_at: t.created_at,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.get(),
            kind: n.kind,
            message: n.message,
            read: n.read_at.is_some(),
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub unread_count: i64,
    pub items: Vec<NotificationResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedResponse {
    pub marked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_listing_validation() {
        let draft = CreateListingRequest {
            title: Some("  Road bike  ".into()),
            description: None,
            price_cents: Some(25_000),
        }
        .validate()
        .unwrap();
        assert_eq!(draft.title, "Road bike");
        assert_eq!(draft.description, "");

        let missing_price = CreateListingRequest {
            title: Some("Road bike".into()),
            ..Default::default()
        };
        assert!(matches!(missing_price.validate(), Err(MarketError::BadInput(_))));

        let free = CreateListingRequest {
            title: Some("Road bike".into()),
            description: None,
            price_cents: Some(0),
        };
        assert!(free.validate().is_err());
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert!(UpdateListingRequest::default().validate().is_err());
    }

    #[test]
    fn test_status_query() {
        let q = StatusQuery {
            status: Some("pending".into()),
            ..Default::default()
        };
        assert_eq!(q.status(ListingStatus::from_code).unwrap(), Some(ListingStatus::Pending));

        let q = StatusQuery {
            status: Some("SHIPPED".into()),
            ..Default::default()
        };
        assert!(q.status(ListingStatus::from_code).is_err());
        assert_eq!(StatusQuery::default().status(CaseStatus::from_code).unwrap(), None);
    }

    #[test]
    fn test_ids_must_be_positive() {
        let req = PlaceOrderRequest { listing_id: Some(0) };
        assert!(matches!(req.validate(), Err(MarketError::BadInput(_))));
    }

    #[test]
    fn test_note_required_for_rejection() {
        assert!(NoteRequest { note: Some("   ".into()) }.required().is_err());
        assert_eq!(NoteRequest::default().optional().unwrap(), None);
    }
}
