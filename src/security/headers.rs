//! Header sanitization for outbound requests.
//!
//! # Responsibilities
//! - Strip headers that reveal the client's network identity
//! - Drop `Host` so the upstream sees its own name
//!
//! # Design Decisions
//! - Never add X-Forwarded-* of our own; the relay is meant to be transparent
//! - Everything else passes through untouched, multi-value headers included

use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderName};

/// Headers that would leak the client's address to the upstream.
pub const IDENTITY_HEADERS: [HeaderName; 3] = [
    HeaderName::from_static("x-forwarded-for"),
    HeaderName::from_static("x-real-ip"),
    HeaderName::from_static("client-ip"),
];

/// Remove identity headers (every value) and `Host`.
pub fn sanitize_headers(headers: &mut HeaderMap) {
    for name in &IDENTITY_HEADERS {
        headers.remove(name);
    }
    headers.remove(HOST);
}
