//! # Chairside Core
//!
//! Domain logic for the Chairside clinic workstation.
//!
//! This crate contains the appointment status model, the five-stage clinical
//! visit workflow, the draft-invoice cart, and the patient profile gate:
//! - Status vocabulary with a single authoritative transition table
//! - Visit workflow with per-stage validation and one persistence call per
//!   stage save
//! - Server-authoritative billing cart with discount invalidation rules
//! - Typed event bus for cross-component signals
//!
//! **No transport concerns**: HTTP, sessions, and endpoint wiring live in
//! `chairside-api`. Controllers here talk to the clinic server exclusively
//! through the [`backend`] traits.

pub mod appointment;
pub mod backend;
pub mod billing;
pub mod events;
pub mod prescription;
pub mod profile;
pub mod status;
pub mod workflow;

/// Roles a signed-in user can hold.
///
/// Mirrors the server's role vocabulary; advisory for UI gating only — the
/// server enforces authorisation on every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
    Staff,
    Admin,
    Management,
}

pub use backend::{BackendError, BackendResult};
