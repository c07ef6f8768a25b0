//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request headers:
//!     → headers.rs (strip client identity, drop Host)
//!     → forwarded to upstream
//! ```
//!
//! # Design Decisions
//! - The relay does not authenticate clients
//! - Client network identity never leaves the relay

pub mod headers;
