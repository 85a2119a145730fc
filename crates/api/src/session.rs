//! Bearer session lifecycle.
//!
//! The session is explicit process state with an init (login) / teardown
//! (logout or 401) lifecycle. Collaborators hold a [`SessionHandle`] instead
//! of reading ambient storage, so ownership and invalidation stay visible
//! and testable. The cached user details are advisory display data only —
//! the server re-authorises every request from the token.

use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use chairside_core::events::{AppEvent, EventBus};
use chairside_core::UserRole;

/// An authenticated session as issued at login.
#[derive(Clone, Debug)]
pub struct Session {
    /// Bearer token attached to every request.
    pub bearer_token: String,
    /// Signed-in user's identifier.
    pub user_id: Uuid,
    /// Signed-in user's role.
    pub role: UserRole,
    /// Display name for UI chrome. Advisory only.
    pub display_name: String,
}

/// Shared handle to the (at most one) active session.
///
/// Cheap to clone; all clones observe the same session. Expiry publishes
/// [`AppEvent::SessionExpired`] so interested components can react without
/// being wired to the HTTP layer.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
    events: EventBus,
}

impl SessionHandle {
    /// Creates a handle with no active session.
    pub fn new(events: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Installs a session after a successful login.
    pub async fn open(&self, session: Session) {
        tracing::info!(user = %session.user_id, role = ?session.role, "session opened");
        *self.inner.write().await = Some(session);
    }

    /// Tears the session down without an event (explicit logout).
    pub async fn close(&self) {
        *self.inner.write().await = None;
    }

    /// Tears the session down and announces the expiry (401 handling).
    ///
    /// Idempotent: a second expiry on an already-empty handle publishes
    /// nothing, so concurrent 401s produce one event.
    pub async fn expire(&self) {
        let had_session = {
            let mut guard = self.inner.write().await;
            guard.take().is_some()
        };
        if had_session {
            tracing::warn!("session expired; credentials cleared");
            self.events.publish(AppEvent::SessionExpired);
        }
    }

    /// Returns a copy of the active session, if any.
    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    /// Returns the bearer token of the active session, if any.
    pub async fn bearer_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|session| session.bearer_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_session() -> Session {
        Session {
            bearer_token: "tok-123".to_owned(),
            user_id: Uuid::from_u128(0x77),
            role: UserRole::Patient,
            display_name: "Nguyễn Văn A".to_owned(),
        }
    }

    #[tokio::test]
    async fn open_then_close_round_trips() {
        let handle = SessionHandle::new(EventBus::default());
        assert!(handle.current().await.is_none());

        handle.open(patient_session()).await;
        assert_eq!(handle.bearer_token().await.as_deref(), Some("tok-123"));

        handle.close().await;
        assert!(handle.current().await.is_none());
    }

    #[tokio::test]
    async fn expiry_clears_credentials_and_publishes_once() {
        let bus = EventBus::default();
        let mut subscriber = bus.subscribe();
        let handle = SessionHandle::new(bus);
        handle.open(patient_session()).await;

        handle.expire().await;
        handle.expire().await;

        assert!(handle.current().await.is_none());
        assert_eq!(
            subscriber.try_recv().expect("one expiry event"),
            AppEvent::SessionExpired
        );
        assert!(
            subscriber.try_recv().is_err(),
            "a second expiry must not publish again"
        );
    }

    #[tokio::test]
    async fn clones_share_the_same_session() {
        let handle = SessionHandle::new(EventBus::default());
        let clone = handle.clone();

        handle.open(patient_session()).await;
        assert_eq!(clone.bearer_token().await.as_deref(), Some("tok-123"));

        clone.close().await;
        assert!(handle.current().await.is_none());
    }
}
