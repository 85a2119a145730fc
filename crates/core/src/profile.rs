//! Patient profile completion gate.
//!
//! Patients with incomplete profiles get a non-blocking completion prompt;
//! the gate owns the completeness state behind that prompt. Only the patient
//! role ever queries the backend — every other role trivially passes. An
//! errored check resolves to incomplete, so a flaky backend prompts rather
//! than silently assuming the profile is fine.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::backend::ProfileBackend;
use crate::events::AppEvent;
use crate::UserRole;

/// The gate's view of profile completeness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileGateState {
    /// No check has run yet.
    Unknown,
    /// A check is in flight.
    Checking,
    /// The profile is complete; no prompt.
    Complete,
    /// The profile needs attention; show the completion prompt.
    Incomplete,
}

/// Completion gate for the signed-in user.
pub struct ProfileGate {
    backend: Arc<dyn ProfileBackend>,
    role: UserRole,
    state: ProfileGateState,
}

impl ProfileGate {
    pub fn new(backend: Arc<dyn ProfileBackend>, role: UserRole) -> Self {
        Self {
            backend,
            role,
            state: ProfileGateState::Unknown,
        }
    }

    pub fn state(&self) -> ProfileGateState {
        self.state
    }

    /// Runs a completeness check and returns the resulting state.
    ///
    /// Non-patient roles resolve to [`ProfileGateState::Complete`] without a
    /// backend call. A backend failure resolves to
    /// [`ProfileGateState::Incomplete`].
    pub async fn check(&mut self) -> ProfileGateState {
        if self.role != UserRole::Patient {
            self.state = ProfileGateState::Complete;
            return self.state;
        }

        self.state = ProfileGateState::Checking;
        self.state = match self.backend.profile_complete().await {
            Ok(true) => ProfileGateState::Complete,
            Ok(false) => ProfileGateState::Incomplete,
            Err(error) => {
                tracing::warn!(%error, "profile completeness check failed; prompting");
                ProfileGateState::Incomplete
            }
        };
        self.state
    }

    /// Drives the gate from an event subscription until the bus closes.
    ///
    /// Each [`AppEvent::ProfileUpdated`] triggers a fresh check; other
    /// events are ignored, and a lagged subscription skips ahead rather than
    /// stopping.
    pub async fn watch(&mut self, mut events: broadcast::Receiver<AppEvent>) {
        loop {
            match events.recv().await {
                Ok(AppEvent::ProfileUpdated) => {
                    self.check().await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "profile gate lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
