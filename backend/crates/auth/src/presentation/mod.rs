//! Presentation Layer
//!
//! HTTP handlers, DTOs, the session extractor and routers.

pub mod dto;
pub mod extractor;
pub mod handlers;
pub mod router;

pub use extractor::CurrentSession;
pub use handlers::AuthAppState;
pub use router::{admin_users_router, auth_router};
