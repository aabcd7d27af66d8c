//! Application Layer
//!
//! One service per resource. Every service checks the session first, loads
//! the record, authorizes against its owners and only then changes state.

pub mod cases;
pub mod config;
pub mod conversations;
pub(crate) mod guard;
pub mod listings;
pub mod notifications;
pub mod orders;
pub mod presence;
pub mod reviews;
pub mod testimonials;
pub mod withdrawals;

pub use cases::CaseService;
pub use config::MarketConfig;
pub use conversations::ConversationService;
pub use listings::{ListingDraft, ListingService};
pub use notifications::NotificationService;
pub use orders::OrderService;
pub use presence::PresenceService;
pub use reviews::ReviewService;
pub use testimonials::TestimonialService;
pub use withdrawals::WithdrawalService;
