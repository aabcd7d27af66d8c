//! Presentation Layer

pub mod dto;
pub mod extractor;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::{market_admin_router, market_router};
pub use state::MarketAppState;
