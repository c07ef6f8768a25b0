//! HTTP server setup and the per-request pipeline.
//!
//! # Responsibilities
//! - Create the Axum router (every method, every path)
//! - Wire up tracing middleware
//! - Run resolve → forward → relay for each request
//! - Map pre-commit failures to `500` responses

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::credentials::{CommandTokenProvider, TokenProvider};
use crate::http::error::ProxyError;
use crate::http::forward::{upstream_client, Forwarder};
use crate::http::relay;
use crate::observability::metrics;
use crate::routing::resolve_target;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a server using the configured credential command.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let credentials = Arc::new(CommandTokenProvider::from_config(&config.credential));
        Self::with_credentials(config, credentials)
    }

    /// Create a server with an explicit credential provider.
    ///
    /// The configuration is validated here as well, so values the relay
    /// cannot run with (a zero channel capacity, say) fail construction
    /// instead of the first request.
    pub fn with_credentials(
        config: ProxyConfig,
        credentials: Arc<dyn TokenProvider>,
    ) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        // No timeout: see `forward` for the tradeoff.
        let forwarder = Forwarder::new(
            upstream_client(),
            credentials,
            config.credential.host_pattern.clone(),
        );

        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            forwarder: Arc::new(forwarder),
        };

        Ok(Self {
            router: Self::build_router(state),
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target_domain = %self.config.target,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving it on a custom listener or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    match forward(&state, request, start).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(method = %method, kind = e.kind(), error = %e, "Proxy request failed");
            metrics::record_error(e.kind());
            e.into_response()
        }
    }
}

async fn forward(state: &AppState, request: Request, start: Instant) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let target = resolve_target(&parts.uri, &parts.headers, &state.config.target)?;
    if state.config.debug {
        // Debug mode adds a filter directive for this module, so the line
        // survives a stricter `RUST_LOG`.
        tracing::info!(target_url = %target, "Proxying request");
    }

    let method = parts.method.to_string();
    let outbound = state
        .forwarder
        .prepare(parts.method, parts.headers, body, &target)
        .await?;
    let upstream_kind = metrics::upstream_label(
        target.is_override(),
        state.forwarder.requires_credential(outbound.uri()),
    );

    let upstream = state.forwarder.send(outbound).await?;
    metrics::record_request(&method, upstream.status().as_u16(), upstream_kind, start);

    Ok(relay::respond(upstream, &state.config.relay, target.as_str()))
}
