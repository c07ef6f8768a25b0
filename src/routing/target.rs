//! Upstream target resolution.
//!
//! # Responsibilities
//! - Validate the inbound request URL
//! - Strip environment prefixes (`/release`, `/test`) from the path
//! - Pick the upstream origin (`X-Target-Host` header, else the default)
//! - Re-attach the raw query string untouched
//!
//! # Known Imprecision
//! Prefix stripping is a first-occurrence substring replace, not a
//! segment-aware match: `/api/test/x` becomes `/api/x` and `/testing`
//! becomes `ing`. Existing deployments depend on this, so it is kept.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, Uri};
use url::Url;

use crate::http::error::ProxyError;

/// Per-request override of the upstream host. Always reached over https.
pub const X_TARGET_HOST: HeaderName = HeaderName::from_static("x-target-host");

/// Environment prefixes removed from inbound paths, in removal order.
const ENV_PREFIXES: [&str; 2] = ["/release", "/test"];

/// The fully composed upstream URL for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    url: String,
    overridden: bool,
}

impl ResolvedTarget {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Whether `X-Target-Host` picked the origin.
    pub fn is_override(&self) -> bool {
        self.overridden
    }

    pub fn into_string(self) -> String {
        self.url
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Remove the first `/release`, then the first `/test`, wherever they occur.
pub fn normalize_path(path: &str) -> String {
    ENV_PREFIXES
        .iter()
        .fold(path.to_string(), |acc, prefix| acc.replacen(prefix, "", 1))
}

/// Compute the upstream URL for an inbound request.
pub fn resolve_target(
    uri: &Uri,
    headers: &HeaderMap,
    default_origin: &str,
) -> Result<ResolvedTarget, ProxyError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Url::parse(&format!("http://inbound.invalid{}", path_and_query))
        .map_err(|e| ProxyError::MalformedRequest(e.to_string()))?;

    let override_host = match headers.get(X_TARGET_HOST) {
        Some(value) => value
            .to_str()
            .map_err(|e| ProxyError::MalformedRequest(format!("invalid X-Target-Host: {}", e)))?,
        None => "",
    };

    let overridden = !override_host.is_empty();
    let mut url = if !overridden {
        default_origin.to_string()
    } else {
        format!("https://{}", override_host)
    };
    url.push_str(&normalize_path(uri.path()));

    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    Ok(ResolvedTarget { url, overridden })
}
