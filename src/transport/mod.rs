//! Connection transport layer.
//!
//! This module owns everything between the public client facade and the
//! wire: the socket seam, the connection state machine, and the timers that
//! keep the connection alive and bring it back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   commands    ┌──────────────────┐
//! │  RealtimeClient  │──────────────►│  ConnectionActor │
//! │  (cloneable)     │               │  (one task)      │
//! └──────────────────┘               │   state machine  │
//!                                    │   reconnect      │
//!        socket events, timer ticks  │   heartbeat      │
//!       ────────────────────────────►└────────┬─────────┘
//!                                             │ Transport::connect
//!                                    ┌────────▼─────────┐
//!                                    │  WebSocket       │
//!                                    └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Exponential reconnect delay calculator |
//! | `connection` | Event loop and state machine (internal) |
//! | `heartbeat` | Periodic liveness signal driver |
//! | `socket` | [`Transport`] trait and the tungstenite implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Exponential reconnect delay calculator.
pub mod backoff;

/// Connection event loop and state machine.
pub(crate) mod connection;

/// Periodic liveness signal driver.
pub mod heartbeat;

/// Socket seam and default implementation.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::delay_for_attempt;
pub use heartbeat::Heartbeat;
pub use socket::{Transport, TungsteniteTransport};
