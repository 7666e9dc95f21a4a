//! Type-safe identifiers for registered callbacks.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//! `register` and `subscribe` hand these out; `unregister` and
//! `unsubscribe` take them back. IDs are unique per client instance and
//! never reused.

use std::fmt;

// ============================================================================
// HandlerId
// ============================================================================

/// Identifies a message handler registered for a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Creates a handler ID from a raw value.
    #[inline]
    #[must_use]
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

// ============================================================================
// SubscriberId
// ============================================================================

/// Identifies a status subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Creates a subscriber ID from a raw value.
    #[inline]
    #[must_use]
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_id_display() {
        let id = HandlerId::new(7);
        assert_eq!(id.to_string(), "handler-7");
        assert_eq!(id.value(), 7);
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Same raw value, different types; equality only within a type.
        let handler = HandlerId::new(1);
        let other = HandlerId::new(1);
        assert_eq!(handler, other);

        let subscriber = SubscriberId::new(1);
        assert_eq!(subscriber.value(), handler.value());
    }
}
