//! Wire protocol message types.
//!
//! This module defines the message format exchanged with the Nyx server:
//! JSON text frames carrying a mandatory `type` discriminator plus an
//! open-ended payload of additional named fields.
//!
//! # Frame Format
//!
//! ```json
//! { "type": "alert", "message": "proxy pool exhausted", "severity": "high" }
//! ```
//!
//! The client treats the payload as opaque beyond the `type` field; payload
//! schemas belong to the dashboard modules (campaigns, devices, proxies,
//! crawlers) and are not modeled here.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | [`Envelope`] and the [`MessageType`] catalog |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope and message-type catalog.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Envelope, MessageType};
