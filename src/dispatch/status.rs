//! Connection state and subscriber notification.
//!
//! The broadcaster owns the single current [`ConnectionState`] per client
//! and the ordered subscriber list. Subscribers added while a connection is
//! already up still learn the current state: `subscribe` invokes the new
//! callback once, synchronously, before returning.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::identifiers::SubscriberId;

// ============================================================================
// ConnectionState
// ============================================================================

/// Connection lifecycle state.
///
/// Transitions are driven exclusively by the connection manager; every
/// transition is broadcast to all status subscribers, with consecutive
/// duplicates suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket handshake in progress.
    Connecting,
    /// Socket open and ready.
    Connected,
    /// No socket; the initial state, and the state after a close.
    Disconnected,
    /// Socket reported an error or could not be constructed.
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Status subscriber callback type.
pub type StatusHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

// ============================================================================
// StatusBroadcaster
// ============================================================================

/// Multi-subscriber notification of connection-state changes.
///
/// # Thread Safety
///
/// `StatusBroadcaster` is `Send + Sync`. Publishing iterates over a snapshot
/// of the subscriber list, so subscribers may unsubscribe (including
/// themselves) while a broadcast is in flight.
pub struct StatusBroadcaster {
    inner: Mutex<BroadcasterInner>,
}

struct BroadcasterInner {
    current: ConnectionState,
    next_id: u64,
    subscribers: Vec<(SubscriberId, StatusHandler)>,
}

impl StatusBroadcaster {
    /// Creates a broadcaster in the [`ConnectionState::Disconnected`] state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BroadcasterInner {
                current: ConnectionState::Disconnected,
                next_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn current(&self) -> ConnectionState {
        self.inner.lock().current
    }

    /// Adds a subscriber and replays the current state to it.
    ///
    /// The new subscriber is invoked once, synchronously, with the current
    /// state before this method returns, so late subscribers never miss the
    /// state they joined in.
    pub fn subscribe(&self, handler: impl Fn(ConnectionState) + Send + Sync + 'static) -> SubscriberId {
        let handler: StatusHandler = Arc::new(handler);
        let (id, current) = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = SubscriberId::new(inner.next_id);
            inner.subscribers.push((id, Arc::clone(&handler)));
            (id, inner.current)
        };

        Self::invoke(id, &handler, current);
        id
    }

    /// Removes a subscriber.
    ///
    /// No-op if the ID is not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner
            .subscribers
            .iter()
            .position(|(entry_id, _)| *entry_id == id)
        {
            inner.subscribers.remove(pos);
        }
    }

    /// Publishes a state transition to all subscribers.
    ///
    /// Repeated identical states are suppressed: subscribers are only
    /// notified when the state actually changes. Subscribers run in
    /// registration order; a panicking subscriber is caught and logged and
    /// does not prevent the rest from running.
    pub fn publish(&self, new_state: ConnectionState) {
        let snapshot: Vec<(SubscriberId, StatusHandler)> = {
            let mut inner = self.inner.lock();
            if inner.current == new_state {
                return;
            }
            inner.current = new_state;
            inner.subscribers.clone()
        };

        for (id, handler) in snapshot {
            Self::invoke(id, &handler, new_state);
        }
    }

    fn invoke(id: SubscriberId, handler: &StatusHandler, state: ConnectionState) {
        if catch_unwind(AssertUnwindSafe(|| handler(state))).is_err() {
            warn!(
                subscriber = %id,
                state = %state,
                "status subscriber panicked; continuing with remaining subscribers"
            );
        }
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
