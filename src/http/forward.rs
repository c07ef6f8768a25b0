//! Outbound request construction and dispatch.
//!
//! # Responsibilities
//! - Rebuild the inbound request against the resolved upstream URL
//! - Strip headers that reveal the client's network identity
//! - Inject a bearer token for managed AI-platform hosts
//! - Send the request and hand back the unread upstream response
//!
//! # Design Decisions
//! - The resolved URL becomes an `http::Uri` as-is: path and query bytes
//!   reach the upstream exactly as composed, with no re-encoding and no
//!   dot-segment removal
//! - The inbound body is streamed straight into the outbound request
//! - The client has no timeout: streamed LLM responses can run for minutes.
//!   This trades resource exhaustion risk for compatibility with slow
//!   upstreams; a hardening pass should add a configurable deadline
//! - Nothing is retried and redirects are relayed, not followed

use std::sync::Arc;

use axum::body::{Body, HttpBody};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::credentials::{CredentialError, TokenProvider};
use crate::http::error::ProxyError;
use crate::routing::ResolvedTarget;
use crate::security::headers::sanitize_headers;

/// Pooled upstream client speaking plain HTTP and HTTPS.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the upstream client. Environment proxy settings are not consulted.
pub fn upstream_client() -> UpstreamClient {
    Client::builder(TokioExecutor::new()).build(HttpsConnector::new())
}

/// Builds and sends outbound requests.
pub struct Forwarder {
    client: UpstreamClient,
    credentials: Arc<dyn TokenProvider>,
    credential_host_pattern: String,
}

impl Forwarder {
    pub fn new(
        client: UpstreamClient,
        credentials: Arc<dyn TokenProvider>,
        credential_host_pattern: impl Into<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            credential_host_pattern: credential_host_pattern.into(),
        }
    }

    /// Whether requests to `uri` need an injected bearer token.
    pub fn requires_credential(&self, uri: &Uri) -> bool {
        !self.credential_host_pattern.is_empty()
            && uri
                .host()
                .is_some_and(|host| host.contains(&self.credential_host_pattern))
    }

    /// Turn the inbound parts into the outbound request without sending it.
    pub async fn prepare(
        &self,
        method: Method,
        mut headers: HeaderMap,
        body: Body,
        target: &ResolvedTarget,
    ) -> Result<Request<Body>, ProxyError> {
        let uri: Uri = target
            .as_str()
            .parse()
            .map_err(|e| ProxyError::RequestBuild(format!("{}: {}", target, e)))?;
        if !matches!(uri.scheme_str(), Some("http" | "https")) || uri.host().is_none() {
            return Err(ProxyError::RequestBuild(format!(
                "{}: unsupported scheme or missing host",
                target
            )));
        }

        sanitize_headers(&mut headers);

        let body = if body.is_end_stream() { Body::empty() } else { body };
        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        if self.requires_credential(request.uri()) {
            let token = self.credentials.acquire_token().await?;
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| CredentialError::InvalidToken)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        Ok(request)
    }

    /// Send a prepared request. Returns as soon as the response head arrives.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, ProxyError> {
        self.client
            .request(request)
            .await
            .map_err(ProxyError::UpstreamUnreachable)
    }
}
