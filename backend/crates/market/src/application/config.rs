//! Market configuration

use platform::rate_limit::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Per presence key
    pub heartbeat_rate_limit: RateLimitConfig,
    /// Per IP, conversation messages and case replies
    pub message_rate_limit: RateLimitConfig,
    /// Per IP
    pub listing_create_rate_limit: RateLimitConfig,
    /// Per IP
    pub case_open_rate_limit: RateLimitConfig,
    /// Smallest withdrawal a seller may request (cents)
    pub min_withdrawal_cents: i64,
    /// Upper bound for every paginated listing
    pub max_page_size: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            heartbeat_rate_limit: RateLimitConfig::new(30, 60),
            message_rate_limit: RateLimitConfig::new(20, 60),
            listing_create_rate_limit: RateLimitConfig::new(10, 3600),
            case_open_rate_limit: RateLimitConfig::new(5, 3600),
            min_withdrawal_cents: 1_000,
            max_page_size: 100,
        }
    }
}
