//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (URI + headers)
//!     → target.rs (validate URL, strip env prefixes, pick origin)
//!     → ResolvedTarget
//!     → handed to the request forwarder
//! ```
//!
//! # Design Decisions
//! - One upstream per request, no load balancing or fallbacks
//! - The query string is never parsed or re-encoded
//! - Unreachable or bogus hosts surface only when the forwarder connects

pub mod target;

pub use target::{normalize_path, resolve_target, ResolvedTarget, X_TARGET_HOST};
