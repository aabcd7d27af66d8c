//! Heartbeats and the admin presence snapshot

use std::sync::Arc;

use auth::{Action, Session, authorize};
use platform::client::ClientIdentity;
use platform::presence::{PresenceSnapshot, PresenceTracker};
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::MarketConfig;
use crate::application::guard::enforce_rate_limit;
use crate::error::MarketResult;

pub struct PresenceService {
    tracker: Arc<PresenceTracker>,
    limiter: Arc<FixedWindowRateLimiter>,
    config: Arc<MarketConfig>,
}

impl PresenceService {
    pub fn new(
        tracker: Arc<PresenceTracker>,
        limiter: Arc<FixedWindowRateLimiter>,
        config: Arc<MarketConfig>,
    ) -> Self {
        Self {
            tracker,
            limiter,
            config,
        }
    }

    /// Anonymous visitors count too; a logged-in caller tags the entry
    pub fn heartbeat(&self, session: &Session, client: &ClientIdentity) -> MarketResult<()> {
        let key = client.presence_key();
        enforce_rate_limit(
            &self.limiter,
            &format!("heartbeat:{key}"),
            &self.config.heartbeat_rate_limit,
        )?;
        self.tracker
            .heartbeat(&key, session.user_id().map(|id| id.get()));
        Ok(())
    }

    pub fn stats(&self, session: &Session) -> MarketResult<PresenceSnapshot> {
        authorize(session, Action::PresenceStats, None)?;
        Ok(self.tracker.snapshot())
    }
}
