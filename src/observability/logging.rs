//! Structured logging setup.
//!
//! `RUST_LOG` overrides the default filter. The format comes from
//! `observability.log_format`: `pretty` for terminals, `json` for shipping.
//! With debug output on, the per-request URL line is enabled on top of
//! whatever filter is in effect.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

pub const DEFAULT_FILTER: &str = "api_relay=info,tower_http=debug";

/// Enables the resolved-URL events emitted by the request handler.
pub const DEBUG_DIRECTIVE: &str = "api_relay::http::server=info";

/// Parse `directives` and, in debug mode, add [`DEBUG_DIRECTIVE`].
pub fn build_filter(directives: &str, debug: bool) -> Result<EnvFilter, ParseError> {
    let filter = EnvFilter::try_new(directives)?;
    if debug {
        Ok(filter.add_directive(DEBUG_DIRECTIVE.parse()?))
    } else {
        Ok(filter)
    }
}

/// Install the global subscriber. Call once, before serving.
pub fn init_logging(format: LogFormat, debug: bool) -> Result<(), ParseError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => build_filter(&directives, debug)
            .or_else(|_| build_filter(DEFAULT_FILTER, debug))?,
        Err(_) => build_filter(DEFAULT_FILTER, debug)?,
    };
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
    Ok(())
}
