//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::fmt;
use std::time::Duration;

use platform::crypto::{KEY_LEN, random_key};
use platform::rate_limit::RateLimitConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Session cookie name (also bound into the cookie's AEAD tag)
    pub session_cookie_name: String,
    /// AES-256-GCM key sealing the session cookie
    pub session_secret: [u8; KEY_LEN],
    /// Cookie lifetime; sessions carry no other expiry
    pub session_max_age: Duration,
    /// Only true in production deployments
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Per-IP login attempts
    pub login_rate_limit: RateLimitConfig,
    /// Per-IP account creations
    pub register_rate_limit: RateLimitConfig,
    /// Upper bound for admin user listings
    pub max_page_size: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "market_session".to_string(),
            session_secret: [0u8; KEY_LEN],
            session_max_age: Duration::from_secs(7 * 24 * 3600), // 1 week
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            login_rate_limit: RateLimitConfig::new(10, 60),
            register_rate_limit: RateLimitConfig::new(5, 3600),
            max_page_size: 100,
        }
    }
}

impl AuthConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: random_key(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn session_max_age_secs(&self) -> i64 {
        i64::try_from(self.session_max_age.as_secs()).unwrap_or(i64::MAX)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_cookie_name", &self.session_cookie_name)
            .field("session_secret", &"[REDACTED]")
            .field("session_max_age", &self.session_max_age)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_same_site", &self.cookie_same_site)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .field("login_rate_limit", &self.login_rate_limit)
            .field("register_rate_limit", &self.register_rate_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_config() {
        let config = AuthConfig::development();
        assert!(!config.cookie_secure);
        assert_ne!(config.session_secret, [0u8; KEY_LEN]);
        assert_eq!(config.session_max_age_secs(), 604_800);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AuthConfig {
            password_pepper: Some(b"pepper".to_vec()),
            ..AuthConfig::with_random_secret()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("pepper\""));
    }
}
