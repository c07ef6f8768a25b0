//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every problem is
//! collected so a bad config file is fixed in one pass.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target `{0}` is not an absolute URL")]
    TargetNotUrl(String),

    #[error("target `{0}` must use http or https")]
    TargetScheme(String),

    #[error("target `{0}` has no host")]
    TargetHost(String),

    #[error("target `{0}` must not end with `/`")]
    TargetTrailingSlash(String),

    #[error("bind address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("relay.chunk_size must be greater than zero")]
    ChunkSize,

    #[error("relay.channel_capacity must be greater than zero")]
    ChannelCapacity,

    #[error("credential.command must name a program")]
    CredentialCommand,

    #[error("metrics address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.target) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::TargetScheme(config.target.clone()));
            }
            if url.host_str().map_or(true, str::is_empty) {
                errors.push(ValidationError::TargetHost(config.target.clone()));
            }
        }
        Err(_) => errors.push(ValidationError::TargetNotUrl(config.target.clone())),
    }
    // Paths are appended verbatim, so a trailing slash would double up.
    if config.target.ends_with('/') {
        errors.push(ValidationError::TargetTrailingSlash(config.target.clone()));
    }

    if config.bind_address().parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.bind_address()));
    }

    if config.relay.chunk_size == 0 {
        errors.push(ValidationError::ChunkSize);
    }
    if config.relay.channel_capacity == 0 {
        errors.push(ValidationError::ChannelCapacity);
    }

    if config.credential.command.first().map_or(true, |p| p.is_empty()) {
        errors.push(ValidationError::CredentialCommand);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
