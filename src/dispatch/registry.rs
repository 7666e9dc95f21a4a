//! Per-message-type handler lists and dispatch.
//!
//! The registry maps each [`MessageType`] to an ordered list of handler
//! callbacks. Insertion order defines invocation order; the same closure may
//! be registered under multiple types; removal is by the [`HandlerId`]
//! returned at registration.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::identifiers::HandlerId;
use crate::protocol::{Envelope, MessageType};

// ============================================================================
// Types
// ============================================================================

/// Message handler callback type.
///
/// Called with the full envelope for every dispatched message of the
/// registered type.
pub type MessageHandler = Arc<dyn Fn(&Envelope) + Send + Sync>;

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Mapping from message type to an ordered list of handlers.
///
/// # Thread Safety
///
/// `HandlerRegistry` is `Send + Sync`; registration and dispatch may race
/// freely. Dispatch iterates over a snapshot of the handler list, so
/// handlers may register or unregister (including themselves) while a
/// dispatch is in flight.
pub struct HandlerRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    next_id: u64,
    handlers: FxHashMap<MessageType, Vec<(HandlerId, MessageHandler)>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 0,
                handlers: FxHashMap::default(),
            }),
        }
    }

    /// Registers a handler for a message type.
    ///
    /// Appends to the list for `kind`; multiple handlers may be registered
    /// for the same type and all receive each message, in registration
    /// order. No de-duplication is performed.
    pub fn register(
        &self,
        kind: MessageType,
        handler: impl Fn(&Envelope) + Send + Sync + 'static,
    ) -> HandlerId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = HandlerId::new(inner.next_id);
        inner
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler from the list for a message type.
    ///
    /// No-op if the ID is not registered under `kind`.
    pub fn unregister(&self, kind: &MessageType, id: HandlerId) {
        let mut inner = self.inner.lock();
        if let Some(list) = inner.handlers.get_mut(kind) {
            if let Some(pos) = list.iter().position(|(entry_id, _)| *entry_id == id) {
                list.remove(pos);
            }
            if list.is_empty() {
                inner.handlers.remove(kind);
            }
        }
    }

    /// Dispatches an envelope to every handler registered for its type.
    ///
    /// A message type with no handlers is a no-op, not an error. Each
    /// handler invocation is isolated: a panic is caught and logged and
    /// does not prevent subsequent handlers from running.
    pub fn dispatch(&self, envelope: &Envelope) {
        let snapshot: Vec<(HandlerId, MessageHandler)> = {
            let inner = self.inner.lock();
            match inner.handlers.get(&envelope.kind) {
                Some(list) => list.clone(),
                None => {
                    trace!(kind = %envelope.kind, "no handlers registered for message type");
                    return;
                }
            }
        };

        for (id, handler) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(envelope))).is_err() {
                warn!(
                    kind = %envelope.kind,
                    handler = %id,
                    "message handler panicked; continuing with remaining handlers"
                );
            }
        }
    }

    /// Returns the number of handlers registered for a message type.
    #[inline]
    #[must_use]
    pub fn handler_count(&self, kind: &MessageType) -> usize {
        self.inner
            .lock()
            .handlers
            .get(kind)
            .map_or(0, |list| list.len())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn alert(message: &str) -> Envelope {
        Envelope::new(MessageType::Alert).with_field("message", message)
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = HandlerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.register(MessageType::Alert, move |_| order.lock().push(label));
        }

        registry.dispatch(&alert("x"));
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_without_handlers_is_noop() {
        let registry = HandlerRegistry::new();
        registry.dispatch(&alert("nobody listening"));
    }

    #[test]
    fn test_panicking_handler_does_not_block_later_handlers() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        registry.register(MessageType::Alert, |_| panic!("boom"));
        let calls_clone = Arc::clone(&calls);
        registry.register(MessageType::Alert, move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&alert("x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_removes_only_matching_handler() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_a = Arc::clone(&calls);
        let id_a = registry.register(MessageType::Alert, move |_| {
            calls_a.fetch_add(1, Ordering::SeqCst);
        });
        let calls_b = Arc::clone(&calls);
        registry.register(MessageType::Alert, move |_| {
            calls_b.fetch_add(10, Ordering::SeqCst);
        });

        registry.unregister(&MessageType::Alert, id_a);
        registry.dispatch(&alert("x"));

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(registry.handler_count(&MessageType::Alert), 1);
    }

    #[test]
    fn test_unregister_unknown_id_is_noop() {
        let registry = HandlerRegistry::new();
        let id = registry.register(MessageType::Alert, |_| {});
        // Wrong type: the alert handler stays.
        registry.unregister(&MessageType::Notification, id);
        assert_eq!(registry.handler_count(&MessageType::Alert), 1);
    }

    #[test]
    fn test_handler_under_multiple_types() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let shared = {
            let calls = Arc::clone(&calls);
            move |_: &Envelope| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        };
        registry.register(MessageType::Alert, shared.clone());
        registry.register(MessageType::Notification, shared);

        registry.dispatch(&alert("x"));
        registry.dispatch(&Envelope::new(MessageType::Notification));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_may_unregister_itself_during_dispatch() {
        let registry = Arc::new(HandlerRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let registry_clone = Arc::clone(&registry);
        let calls_clone = Arc::clone(&calls);
        let id_cell = Arc::new(Mutex::new(None));
        let id_cell_clone = Arc::clone(&id_cell);

        let id = registry.register(MessageType::Alert, move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_cell_clone.lock() {
                registry_clone.unregister(&MessageType::Alert, id);
            }
        });
        *id_cell.lock() = Some(id);

        registry.dispatch(&alert("x"));
        registry.dispatch(&alert("y"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
