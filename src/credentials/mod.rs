//! Upstream credential acquisition.
//!
//! # Data Flow
//! ```text
//! Forwarder sees an AI-platform host
//!     → TokenProvider::acquire_token()
//!     → command.rs runs the configured CLI (gcloud by default)
//!     → trimmed stdout becomes `Authorization: Bearer <token>`
//! ```
//!
//! # Design Decisions
//! - Tokens are opaque strings; nothing parses or caches them
//! - Providers sit behind a trait so tests never spawn processes

pub mod command;

use futures_util::future::BoxFuture;
use thiserror::Error;

pub use command::CommandTokenProvider;

/// Errors raised while obtaining a bearer token.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The provider program could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider program exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The token cannot be carried in an HTTP header.
    #[error("token contains characters not allowed in a header")]
    InvalidToken,

    /// Provider-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Source of bearer tokens for upstream calls.
pub trait TokenProvider: Send + Sync {
    /// Produce a fresh access token.
    fn acquire_token(&self) -> BoxFuture<'_, Result<String, CredentialError>>;
}
