//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Upstream used when neither the config file nor the CLI names one.
pub const DEFAULT_TARGET: &str = "https://api.openai.com";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 9000;

/// Root configuration for the relay.
///
/// Built once at startup and never mutated afterwards; the server receives
/// it by value and shares it read-only across request tasks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Default upstream origin (scheme + host, optional path prefix).
    pub target: String,

    /// Listening port.
    pub port: u16,

    /// Interface to bind on.
    pub bind_host: String,

    /// Log every resolved outbound URL.
    pub debug: bool,

    /// Bearer credential injection for managed AI-platform hosts.
    pub credential: CredentialConfig,

    /// Response relay tuning.
    pub relay: RelayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Socket address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            port: DEFAULT_PORT,
            bind_host: "0.0.0.0".to_string(),
            debug: false,
            credential: CredentialConfig::default(),
            relay: RelayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Credential provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Substring of the upstream host that triggers token injection.
    pub host_pattern: String,

    /// Program and arguments printing an access token on stdout.
    pub command: Vec<String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            host_pattern: "aiplatform.googleapis.com".to_string(),
            command: ["gcloud", "auth", "application-default", "print-access-token"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Response relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum bytes forwarded per read from the upstream body.
    pub chunk_size: usize,

    /// Frames buffered between the relay task and the client connection.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            channel_capacity: 16,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics listener address (e.g., "0.0.0.0:9090").
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.target, "https://api.openai.com");
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.relay.chunk_size, 1024);
        assert_eq!(config.credential.command[0], "gcloud");
        assert!(!config.debug);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            port = 8088

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8088);
        assert_eq!(config.target, DEFAULT_TARGET);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.credential.host_pattern, "aiplatform.googleapis.com");
    }
}
