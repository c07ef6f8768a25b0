//! Command-line arguments and the startup merge.
//!
//! Precedence, lowest first: built-in defaults, the TOML file given by
//! `--config`, explicit flags, then `ENV=local` which forces debug output.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::config::validation::validate_config;

/// Environment variable that enables debug output when set to `local`.
pub const ENV_VAR: &str = "ENV";

#[derive(Debug, Parser)]
#[command(name = "api-relay")]
#[command(about = "Transparent streaming reverse proxy for HTTP APIs", long_about = None)]
pub struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The target domain to proxy.
    #[arg(long)]
    pub domain: Option<String>,

    /// The proxy port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to bind on.
    #[arg(long)]
    pub bind: Option<String>,

    /// Log the resolved upstream URL of every request.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Build the validated startup configuration.
    pub fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let env = std::env::var(ENV_VAR).ok();
        self.load_with_env(env.as_deref())
    }

    fn load_with_env(&self, env: Option<&str>) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(domain) = &self.domain {
            config.target = domain.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = &self.bind {
            config.bind_host = bind.clone();
        }
        if self.debug || env == Some("local") {
            config.debug = true;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
