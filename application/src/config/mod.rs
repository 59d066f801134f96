//! Application-level configuration.
//!
//! - [`SessionConfig`] - decode, routing, step budget and render throttling
//!   for one research session

pub mod session_config;

pub use session_config::SessionConfig;
