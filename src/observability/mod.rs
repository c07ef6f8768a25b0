//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline and relay tasks produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout / log aggregation
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of interpolated messages
//! - Metrics are recorded unconditionally; without an exporter they are dropped

pub mod logging;
pub mod metrics;
