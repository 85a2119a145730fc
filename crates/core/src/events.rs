//! Application-wide typed event bus.
//!
//! Cross-component signals (profile updated, session expired, invoice
//! finalised) travel through this bus instead of ambient global events, so
//! publishers and subscribers stay decoupled and the payloads stay typed.

use tokio::sync::broadcast;
use uuid::Uuid;

/// Events that cross component boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    /// A patient profile was saved; the profile gate should re-check.
    ProfileUpdated,
    /// The bearer session was invalidated (401 or explicit logout).
    SessionExpired,
    /// An invoice was finalised; pending-payment views should refresh.
    InvoiceFinalised { invoice_id: Uuid },
}

/// Broadcast bus carrying [`AppEvent`]s to any number of subscribers.
///
/// Cheap to clone; all clones publish into the same channel. Publishing with
/// no live subscribers is not an error. Slow subscribers may lag and miss
/// events, which is acceptable for these advisory signals.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: AppEvent) {
        tracing::debug!(?event, "publishing application event");
        // A send error only means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    /// Opens a new subscription receiving events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
