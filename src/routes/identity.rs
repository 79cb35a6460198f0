//! Caller identity — the opaque key chatters are stored under.
//!
//! Prefers the configured forwarded-IP header (set by a trusted proxy), then
//! the peer socket address from `ConnectInfo`.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::state::AppState;

/// Key used when neither a forwarded header nor a peer address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl<S> FromRequestParts<S> for ClientKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(Self(resolve_key(parts, &app_state.config.forwarded_ip_header)))
    }
}

fn resolve_key(parts: &Parts, forwarded_header: &str) -> String {
    let forwarded = parts
        .headers
        .get(forwarded_header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| UNKNOWN_CLIENT.to_owned(), |ConnectInfo(addr)| addr.to_string())
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
