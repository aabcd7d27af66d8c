//! Session Store
//!
//! Resolves the sealed session cookie into a [`Session`]. Resolution never
//! fails: a missing, malformed, tampered or foreign-key cookie yields an
//! anonymous session. Rotating the secret therefore logs everybody out.

use axum::http::HeaderMap;
use platform::cookie::{CookieConfig, extract_cookie};
use platform::crypto::SealingKey;

use crate::application::config::AuthConfig;
use crate::domain::entity::session::Session;
use crate::error::{AuthError, AuthResult};

pub struct SessionStore {
    key: SealingKey,
    cookie: CookieConfig,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cookie", &self.cookie)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: SealingKey::new(&config.session_secret),
            cookie: CookieConfig {
                name: config.session_cookie_name.clone(),
                secure: config.cookie_secure,
                http_only: true,
                same_site: config.cookie_same_site,
                path: "/".to_string(),
                max_age_secs: Some(config.session_max_age_secs()),
            },
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }

    /// Session carried by the request's cookie, or an anonymous one
    pub fn resolve(&self, headers: &HeaderMap) -> Session {
        match extract_cookie(headers, &self.cookie.name) {
            Some(token) => self.open(&token),
            None => Session::anonymous(),
        }
    }

    /// Decrypt a cookie value
    pub fn open(&self, token: &str) -> Session {
        let plaintext = match self.key.open(token, self.cookie.name.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unreadable session cookie");
                return Session::anonymous();
            }
        };

        serde_json::from_slice(&plaintext).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Discarding session cookie with unexpected payload");
            Session::anonymous()
        })
    }

    /// Encrypt a session into a cookie value
    pub fn seal(&self, session: &Session) -> AuthResult<String> {
        let payload =
            serde_json::to_vec(session).map_err(|e| AuthError::Internal(e.to_string()))?;
        self.key
            .seal(&payload, self.cookie.name.as_bytes())
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// `Set-Cookie` value persisting `session`
    pub fn save_cookie(&self, session: &Session) -> AuthResult<String> {
        Ok(self.cookie.build_set_cookie(&self.seal(session)?))
    }

    /// `Set-Cookie` value removing the session cookie
    pub fn clear_cookie(&self) -> String {
        self.cookie.build_delete_cookie()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::session::SessionUser;
    use crate::domain::value_object::{user_id::UserId, user_role::UserRole};
    use axum::http::{HeaderValue, header};

    fn user_session() -> Session {
        Session::authenticated(SessionUser {
            id: UserId::from_db(11),
            email: "seller@example.com".into(),
            name: Some("Camille".into()),
            role: UserRole::User,
        })
    }

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_seal_then_resolve() {
        let store = SessionStore::new(&AuthConfig::development());
        let token = store.seal(&user_session()).unwrap();
        let headers = headers_with_cookie(&format!("theme=dark; market_session={token}"));
        assert_eq!(store.resolve(&headers), user_session());
    }

    #[test]
    fn test_missing_cookie_is_anonymous() {
        let store = SessionStore::new(&AuthConfig::development());
        assert_eq!(store.resolve(&HeaderMap::new()), Session::anonymous());
        assert_eq!(store.resolve(&headers_with_cookie("other=1")), Session::anonymous());
    }

    #[test]
    fn test_garbage_and_tampered_cookies_are_anonymous() {
        let store = SessionStore::new(&AuthConfig::development());
        assert_eq!(store.open("garbage"), Session::anonymous());
        assert_eq!(store.open(""), Session::anonymous());

        let mut token = store.seal(&user_session()).unwrap();
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });
        assert_eq!(store.open(&token), Session::anonymous());
    }

    #[test]
    fn test_rotated_secret_invalidates_sessions() {
        let old = SessionStore::new(&AuthConfig::development());
        let new = SessionStore::new(&AuthConfig::development());
        let token = old.seal(&user_session()).unwrap();
        assert_eq!(new.open(&token), Session::anonymous());
    }

    #[test]
    fn test_cookie_bound_to_its_name() {
        let config = AuthConfig::development();
        let store = SessionStore::new(&config);
        let other = SessionStore::new(&AuthConfig {
            session_cookie_name: "other_cookie".into(),
            ..config
        });
        let token = store.seal(&user_session()).unwrap();
        assert_eq!(other.open(&token), Session::anonymous());
    }

    #[test]
    fn test_save_cookie_attributes() {
        let dev = SessionStore::new(&AuthConfig::development());
        let cookie = dev.save_cookie(&user_session()).unwrap();
        assert!(cookie.starts_with("market_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        let prod = SessionStore::new(&AuthConfig::with_random_secret());
        assert!(prod.save_cookie(&user_session()).unwrap().contains("; Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let store = SessionStore::new(&AuthConfig::development());
        let cookie = store.clear_cookie();
        assert!(cookie.starts_with("market_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
