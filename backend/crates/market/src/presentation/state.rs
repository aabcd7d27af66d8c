//! Shared state for market handlers

use std::sync::Arc;

use auth::SessionStore;
use axum::extract::FromRef;
use platform::presence::PresenceTracker;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::MarketConfig;

pub struct MarketAppState<R> {
    pub repo: Arc<R>,
    pub config: Arc<MarketConfig>,
    pub sessions: Arc<SessionStore>,
    pub limiter: Arc<FixedWindowRateLimiter>,
    pub presence: Arc<PresenceTracker>,
}

impl<R> MarketAppState<R> {
    pub fn new(
        repo: R,
        config: Arc<MarketConfig>,
        sessions: Arc<SessionStore>,
        limiter: Arc<FixedWindowRateLimiter>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            repo: Arc::new(repo),
            config,
            sessions,
            limiter,
            presence,
        }
    }
}

impl<R> Clone for MarketAppState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            sessions: self.sessions.clone(),
            limiter: self.limiter.clone(),
            presence: self.presence.clone(),
        }
    }
}

impl<R> FromRef<MarketAppState<R>> for Arc<SessionStore> {
    fn from_ref(state: &MarketAppState<R>) -> Self {
        state.sessions.clone()
    }
}
