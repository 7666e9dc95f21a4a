//! Nyx Realtime - Resilient typed-message WebSocket client.
//!
//! This library maintains one persistent bidirectional connection to a Nyx
//! server, survives network interruption via automatic reconnection with
//! exponential backoff, keeps the connection alive with periodic heartbeats,
//! and fans typed server-pushed events out to independent consumers.
//!
//! # Architecture
//!
//! The client follows an actor model:
//!
//! - **Facade ([`RealtimeClient`])**: cloneable handle; enqueues commands
//! - **Actor (internal)**: one task owns the socket, the state machine, and
//!   all timers; events are processed strictly in order
//! - **Dispatch ([`dispatch`])**: handler registry and status broadcaster,
//!   shared with callers and safe to mutate during dispatch
//!
//! Key design principles:
//!
//! - One logical connection per client instance; no global state
//! - Faults are contained: handler panics, decode failures, and send errors
//!   never cross the public API boundary
//! - State changes are broadcast in order, duplicates suppressed, and
//!   replayed to late subscribers
//! - Timer cancellation is generation-guarded, so `disconnect` is
//!   unconditionally effective
//!
//! # Quick Start
//!
//! ```no_run
//! use nyx_realtime::{MessageType, RealtimeClient, RealtimeOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Build a client; no socket is opened yet.
//!     let client = RealtimeClient::new(RealtimeOptions::new("ws://localhost:3000/ws"))?;
//!
//!     // Observe connection state, including the current state right away.
//!     client.subscribe(|state| println!("connection: {state}"));
//!
//!     // Receive typed server events.
//!     client.register(MessageType::Alert, |envelope| {
//!         println!("alert: {}", envelope.get_str("message"));
//!     });
//!
//!     // Initiate the connection; reconnection is automatic.
//!     client.connect(Some("secret-token"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`RealtimeClient`] facade |
//! | [`config`] | [`RealtimeOptions`] configuration |
//! | [`dispatch`] | Handler registry and status broadcaster |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe callback IDs |
//! | [`protocol`] | Envelope and message-type catalog |
//! | [`testing`] | In-memory mock transport for tests |
//! | [`transport`] | Socket seam, backoff, heartbeat (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Realtime client facade.
///
/// Use [`RealtimeClient::new`] to create a connected handle.
pub mod client;

/// Client configuration options.
///
/// Use [`RealtimeOptions::new`] and the `with_*` builders.
pub mod config;

/// Message and status dispatch.
///
/// Fans inbound envelopes and state changes out to registered consumers.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for registered callbacks.
pub mod identifiers;

/// Wire protocol message types.
pub mod protocol;

/// In-memory mock transport for socket-free tests.
pub mod testing;

/// Connection transport layer.
///
/// Internal module handling the socket, reconnect backoff, and heartbeat.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::RealtimeClient;

// Configuration
pub use config::RealtimeOptions;

// Dispatch types
pub use dispatch::{ConnectionState, HandlerRegistry, StatusBroadcaster};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{HandlerId, SubscriberId};

// Protocol types
pub use protocol::{Envelope, MessageType};

// Transport seam
pub use transport::{Transport, TungsteniteTransport};
