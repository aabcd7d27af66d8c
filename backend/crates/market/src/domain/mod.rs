//! Domain Layer
//!
//! Entities, value objects and repository traits for the marketplace.

pub mod entity;
pub mod repository;
pub mod value_object;

pub use repository::MarketRepository;
