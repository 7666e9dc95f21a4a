//! Client configuration options.
//!
//! Provides a type-safe interface for configuring the realtime client:
//! server URL, reconnect policy, heartbeat period, and debug logging.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use nyx_realtime::RealtimeOptions;
//!
//! let options = RealtimeOptions::new("ws://localhost:3000/ws")
//!     .with_reconnect_interval(Duration::from_secs(1))
//!     .with_max_reconnect_attempts(10)
//!     .with_debug();
//! ```

use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default base delay between reconnect attempts (3s).
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default growth factor applied to the reconnect delay per attempt.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

/// Default ceiling on consecutive automatic reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default heartbeat period while connected (30s).
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(30_000);

// ============================================================================
// RealtimeOptions
// ============================================================================

/// Realtime client configuration.
///
/// Controls the connection endpoint, the reconnect schedule, and the
/// heartbeat period. All knobs have server-compatible defaults; only the
/// URL is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeOptions {
    /// WebSocket endpoint URL (`ws://` or `wss://`).
    pub url: String,

    /// Base delay for the reconnect backoff schedule.
    pub reconnect_interval: Duration,

    /// Growth factor applied to the reconnect delay per attempt.
    ///
    /// Attempt `n` waits `reconnect_interval * backoff_factor^(n-1)`.
    /// No upper clamp is applied to the resulting delay.
    pub backoff_factor: f64,

    /// Ceiling on consecutive automatic reconnect attempts.
    ///
    /// Once reached, no further attempts are made until the caller invokes
    /// `connect` again.
    pub max_reconnect_attempts: u32,

    /// Heartbeat period while connected.
    pub ping_interval: Duration,

    /// Enables verbose logging of internal events.
    ///
    /// Has no behavioral effect beyond additional `debug!` traces.
    pub debug: bool,
}

// ============================================================================
// Constructors
// ============================================================================

impl RealtimeOptions {
    /// Creates options for the given endpoint with default settings.
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            ping_interval: DEFAULT_PING_INTERVAL,
            debug: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RealtimeOptions {
    /// Sets the base reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the backoff growth factor.
    #[inline]
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets the ceiling on consecutive automatic reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the heartbeat period.
    #[inline]
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Enables verbose event logging.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
