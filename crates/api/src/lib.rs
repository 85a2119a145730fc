//! # Chairside API
//!
//! HTTP client layer for the Chairside clinic workstation.
//!
//! Handles:
//! - Bearer-session lifecycle (login install, logout/401 teardown)
//! - The `{success, data, message}` response envelope
//! - Endpoint wiring for the `chairside-core` backend traits
//!
//! Domain rules live in `chairside-core`; nothing here decides anything
//! beyond how bytes get to and from the clinic server.

pub mod config;
pub mod envelope;
pub mod http;
pub mod session;

pub use config::{ApiConfig, ConfigError};
pub use http::HttpBackend;
pub use session::{Session, SessionHandle};
