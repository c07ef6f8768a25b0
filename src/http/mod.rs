//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, tracing, per-request task)
//!     → routing::target (resolve upstream URL)
//!     → forward.rs (sanitize headers, inject credential, send)
//!     → relay.rs (copy head, stream body chunk by chunk)
//!     → client
//! ```
//!
//! Failures before the response head is committed become `500`s via
//! error.rs; failures after it truncate the stream.

pub mod error;
pub mod forward;
pub mod relay;
pub mod server;

pub use error::ProxyError;
pub use forward::Forwarder;
pub use server::HttpServer;
