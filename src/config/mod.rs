//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (args.rs)
//!     → optional TOML file (loader.rs)
//!     → flag overrides, ENV=local
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → moved into the HTTP server state
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod args;
pub mod loader;
pub mod schema;
pub mod validation;

pub use args::Args;
pub use loader::ConfigError;
pub use schema::{
    CredentialConfig, LogFormat, ObservabilityConfig, ProxyConfig, RelayConfig,
};
pub use validation::{validate_config, ValidationError};
