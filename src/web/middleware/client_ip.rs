//! Client address resolution behind reverse proxies.

use axum::{body::Body, extract::ConnectInfo, http::Request};
use std::net::SocketAddr;

/// Resolve the client IP, trusting `trusted_hops` reverse proxies.
///
/// The candidate chain is the socket peer followed by the `X-Forwarded-For`
/// entries from right to left. Each trusted proxy vouches for the next entry,
/// so the client is the entry `trusted_hops` positions into the chain, or the
/// furthest entry when the chain is shorter. Left-most entries beyond that are
/// supplied by the client and ignored.
pub fn client_ip(req: &Request<Body>, trusted_hops: usize) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if trusted_hops == 0 {
        return peer;
    }

    let forwarded: Vec<&str> = req
        .headers()
        .get_all("X-Forwarded-For")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let hops = trusted_hops.min(forwarded.len());
    if hops == 0 {
        return peer;
    }

    forwarded[forwarded.len() - hops].to_string()
}
