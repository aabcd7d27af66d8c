//! Application Layer
//!
//! Use cases and application services.

pub mod check_session;
pub mod config;
pub mod manage_users;
pub mod session_store;
pub mod sign_in;
pub mod sign_up;

// Re-exports
pub use check_session::SessionStatus;
pub use config::AuthConfig;
pub use manage_users::ManageUsersUseCase;
pub use session_store::SessionStore;
pub use sign_in::{SignInInput, SignInUseCase};
pub use sign_up::{SignUpInput, SignUpUseCase};
