//! Request pipeline errors and their client-facing mapping.
//!
//! Every variant is raised before the response head is committed, so each
//! one still turns into a clean `500`. Failures after commit belong to the
//! relay and never reach this type.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::credentials::CredentialError;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound URL could not be parsed.
    #[error("error parsing URL: {0}")]
    MalformedRequest(String),

    /// The outbound request could not be constructed.
    #[error("error creating proxy request: {0}")]
    RequestBuild(String),

    /// The credential provider failed.
    #[error("error getting upstream credential: {0}")]
    Credential(#[from] CredentialError),

    /// The upstream could not be reached or reset the exchange.
    #[error("error sending proxy request: {}", error_chain(.0))]
    UpstreamUnreachable(#[source] hyper_util::client::legacy::Error),
}

impl ProxyError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MalformedRequest(_) => "malformed_request",
            ProxyError::RequestBuild(_) => "request_build",
            ProxyError::Credential(_) => "credential",
            ProxyError::UpstreamUnreachable(_) => "upstream_unreachable",
        }
    }

    /// Text sent to the client.
    fn client_message(&self) -> String {
        match self {
            ProxyError::MalformedRequest(_) => "Internal Server Error".to_string(),
            ProxyError::RequestBuild(_) => "Error creating proxy request".to_string(),
            ProxyError::Credential(_) => "Error getting upstream credential".to_string(),
            ProxyError::UpstreamUnreachable(e) => error_chain(e),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.client_message()).into_response()
    }
}

/// Render an error with all of its sources, `outer: inner: root`.
///
/// The HTTP client keeps the useful part (connection refused, DNS failure)
/// in the source chain rather than in its own message.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(error_chain(&err), "outer: connection refused");
    }

    #[tokio::test]
    async fn test_generic_client_messages() {
        let response = ProxyError::RequestBuild("bad url".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Error creating proxy request");

        let response = ProxyError::Credential(CredentialError::InvalidToken).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Error getting upstream credential");

        let response = ProxyError::MalformedRequest("bad".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ProxyError::MalformedRequest(String::new()).kind(), "malformed_request");
        assert_eq!(
            ProxyError::Credential(CredentialError::Other("x".into())).kind(),
            "credential"
        );
    }
}
