use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, Extensions, HeaderMap};

use concierge_core::SearchContext;

const FORWARDED_FOR: &str = "x-forwarded-for";
const USER_ID: &str = "x-user-id";

/// Caller metadata read from headers and the connection
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_parts(headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self {
            user_id: header_value(headers, USER_ID),
            ip_address: client_ip(headers, extensions),
            user_agent: header_value(headers, header::USER_AGENT.as_str()),
        }
    }

    pub fn into_context(self) -> SearchContext {
        SearchContext {
            user_id: self.user_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(&parts.headers, &parts.extensions))
    }
}

/// First hop of `X-Forwarded-For`, else the peer address
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    if let Some(forwarded) = header_value(headers, FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(first.to_string());
        }
    }

    peer_ip(extensions)
}

/// Address of the socket peer as recorded by `into_make_service_with_connect_info`
pub fn peer_ip(extensions: &Extensions) -> Option<String> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Identity the rate limiter counts against.
///
/// `X-Forwarded-For` is only honoured when the peer is a listed proxy.
pub fn rate_limit_key(
    headers: &HeaderMap,
    extensions: &Extensions,
    trusted_proxies: &[String],
) -> String {
    let Some(peer) = peer_ip(extensions) else {
        return "unknown".to_string();
    };

    if trusted_proxies.iter().any(|proxy| proxy.trim() == peer) {
        if let Some(forwarded) = client_ip(headers, extensions) {
            return forwarded;
        }
    }

    peer
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
