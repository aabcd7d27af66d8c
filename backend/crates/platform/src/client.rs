//! Client identification utilities
//!
//! Derives caller keys for rate limiting and presence from proxy headers.
//! Header parsing lives here; the limiter and the tracker only ever see
//! the resulting opaque strings.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};

/// Maximum number of user-agent characters that go into a presence key
pub const PRESENCE_UA_MAX_CHARS: usize = 120;

const UNKNOWN_IP: &str = "unknown";

/// Caller identity as seen through the reverse proxy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    /// From `x-forwarded-for`, `x-real-ip`, or the socket peer
    pub ip: Option<IpAddr>,
    /// Raw `User-Agent` header
    pub user_agent: Option<String>,
}

impl ClientIdentity {
    pub fn new(ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }

    /// Build from request headers and the direct peer address
    pub fn from_headers(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            ip: extract_client_ip(headers, direct_ip),
            user_agent,
        }
    }

    /// IP as a key component
    pub fn ip_key(&self) -> String {
        self.ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_IP.to_string())
    }

    /// `"{scope}:{ip}"`, e.g. `"login:203.0.113.7"`
    pub fn rate_limit_key(&self, scope: &str) -> String {
        format!("{}:{}", scope, self.ip_key())
    }

    /// Anonymous visitor fingerprint: IP plus a truncated user agent
    pub fn presence_key(&self) -> String {
        let ua: String = self
            .user_agent
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(PRESENCE_UA_MAX_CHARS)
            .collect();
        format!("{}|{}", self.ip_key(), ua)
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let direct_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());

        Ok(Self::from_headers(&parts.headers, direct_ip))
    }
}

/// Extract client IP address from headers
///
/// Checks `X-Forwarded-For` (first entry) and `X-Real-IP` for reverse proxy
/// setups, then falls back to the direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if let Ok(ip) = real_ip.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }

    direct_ip
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    #[test]
    fn test_extract_client_ip_xff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        headers.insert("x-real-ip", HeaderValue::from_static(" 10.9.9.9 "));

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("10.9.9.9".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_direct() {
        let headers = HeaderMap::new();
        let direct: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(extract_client_ip(&headers, Some(direct)), Some(direct));
        assert_eq!(extract_client_ip(&headers, None), None);
    }

    #[test]
    fn test_keys() {
        let identity = ClientIdentity::new(
            Some("203.0.113.7".parse().unwrap()),
            Some("Mozilla/5.0".to_string()),
        );
        assert_eq!(identity.rate_limit_key("login"), "login:203.0.113.7");
        assert_eq!(identity.presence_key(), "203.0.113.7|Mozilla/5.0");

        let anonymous = ClientIdentity::default();
        assert_eq!(anonymous.rate_limit_key("login"), "login:unknown");
        assert_eq!(anonymous.presence_key(), "unknown|");
    }

    #[test]
    fn test_presence_key_truncates_user_agent() {
        let long_ua = "x".repeat(PRESENCE_UA_MAX_CHARS * 2);
        let a = ClientIdentity::new(None, Some(long_ua.clone()));
        let b = ClientIdentity::new(None, Some(format!("{long_ua}-different-tail")));

        assert_eq!(a.presence_key(), b.presence_key());
        assert_eq!(a.presence_key().len(), "unknown|".len() + PRESENCE_UA_MAX_CHARS);
    }

    #[tokio::test]
    async fn test_extractor_reads_connect_info() {
        let mut req = Request::builder()
            .header(header::USER_AGENT, "TestAgent")
            .body(())
            .unwrap();
        let addr: SocketAddr = "198.51.100.4:5555".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        let (mut parts, _) = req.into_parts();
        let identity = ClientIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(identity.ip, Some(addr.ip()));
        assert_eq!(identity.user_agent.as_deref(), Some("TestAgent"));
    }
}
