//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Clock abstraction (wall clock and a manual clock for tests)
//! - Client identification from proxy headers
//! - Cookie management and AES-256-GCM cookie sealing
//! - Password hashing (Argon2id)
//! - Fixed-window rate limiting
//! - In-memory presence tracking
//!
//! The rate limiter and the presence tracker hold process-local state only:
//! nothing survives a restart and nothing is shared between instances.

pub mod client;
pub mod clock;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod presence;
pub mod rate_limit;
