//! Domain Layer
//!
//! Contains entities, value objects, the authorization policy and repository traits.

pub mod entity;
pub mod policy;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    session::{Session, SessionUser},
    user::{NewUser, User},
};
pub use policy::{AccessDenied, Action, ResourceOwners, authorize};
pub use repository::UserRepository;
