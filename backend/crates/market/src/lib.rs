//! Marketplace Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Listings, orders, conversations, withdrawals, cases, reviews,
//!   testimonials and notifications, with their repository traits
//! - `application/` - One service per resource
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, routers
//!
//! Every state-changing operation checks the session, loads the record,
//! authorizes against the record's owners through [`auth::authorize`] and
//! persists with a compare-and-set on the status it observed.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


pub use application::MarketConfig;
pub use domain::MarketRepository;
pub use error::{MarketError, MarketResult};
pub use infra::{InMemoryMarketRepository, PgMarketRepository};
pub use presentation::{MarketAppState, market_admin_router, market_router};
