//! api-relay
//!
//! A transparent reverse proxy that forwards every request to one upstream
//! API and streams the answer back as it arrives.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request                                              Upstream
//!     ───────────────▶ ┌──────────┐   ┌──────────┐   ┌─────────┐  (default
//!                      │ routing  │──▶│ forward  │──▶│ hyper   │─▶ target or
//!                      │ target   │   │ headers, │   │ client  │  X-Target-Host)
//!                      └──────────┘   │ creds    │   └────┬────┘
//!                                     └──────────┘        │
//!     Client Response  ┌──────────────────────────┐       │
//!     ◀─────────────── │ relay: head, then chunks │◀──────┘
//!                      └──────────────────────────┘
//! ```

use clap::Parser;

use api_relay::config::Args;
use api_relay::lifecycle::startup;
use api_relay::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.load()?;

    logging::init_logging(config.observability.log_format, config.debug)?;
    tracing::info!("api-relay v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
