//! Typed identifiers for market records

use kernel::id::Id;

pub use auth::UserId;

pub struct ListingMarker;
pub struct OrderMarker;
pub struct ConversationMarker;
pub struct MessageMarker;
pub struct WithdrawalMarker;
pub struct CaseMarker;
pub struct ReviewMarker;
pub struct TestimonialMarker;
pub struct NotificationMarker;

pub type ListingId = Id<ListingMarker>;
pub type OrderId = Id<OrderMarker>;
pub type ConversationId = Id<ConversationMarker>;
pub type MessageId = Id<MessageMarker>;
pub type WithdrawalId = Id<WithdrawalMarker>;
pub type CaseId = Id<CaseMarker>;
pub type ReviewId = Id<ReviewMarker>;
pub type TestimonialId = Id<TestimonialMarker>;
pub type NotificationId = Id<NotificationMarker>;
