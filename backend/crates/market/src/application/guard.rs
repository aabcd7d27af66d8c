//! Helpers shared by the market services

use auth::{AccessDenied, Session, SessionUser};
use platform::rate_limit::{FixedWindowRateLimiter, RateLimitConfig};

use crate::domain::entity::notification::{NewNotification, NotificationKind};
use crate::domain::repository::NotificationRepository;
use crate::domain::value_object::ids::UserId;
use crate::error::{MarketError, MarketResult};

/// Logged-in user, checked before any lookup
pub(crate) fn require_user(session: &Session) -> Result<&SessionUser, AccessDenied> {
    session.user().ok_or(AccessDenied::Unauthenticated)
}

pub(crate) fn enforce_rate_limit(
    limiter: &FixedWindowRateLimiter,
    key: &str,
    config: &RateLimitConfig,
) -> MarketResult<()> {
    let result = limiter.check(key, config);
    if result.allowed {
        Ok(())
    } else {
        Err(MarketError::RateLimited {
            retry_after_secs: result.retry_after_secs(limiter.now_ms()),
        })
    }
}

/// Store a notification; failures are logged, never returned
pub(crate) async fn notify<R>(repo: &R, recipient_id: UserId, kind: NotificationKind, message: String)
where
    R: NotificationRepository + Sync,
{
    let notification = NewNotification {
        recipient_id,
        kind,
        message,
    };
    if let Err(e) = repo.create_notification(&notification).await {
        tracing::warn!(error = %e, recipient_id = %recipient_id, kind = %kind, "Failed to store notification");
    }
}
