//! Transport seam for the underlying socket.
//!
//! The connection manager is written against the [`Transport`] trait so the
//! IO implementation can be swapped (real tokio-tungstenite socket vs the
//! in-memory mock in [`crate::testing`]) while the state machine stays
//! unchanged.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use crate::error::Result;

// ============================================================================
// Transport Trait
// ============================================================================

/// Socket factory boundary.
///
/// Each `connect` call produces a fresh reader/writer pair for one socket.
/// The trait is intentionally minimal: protocol and state logic live in the
/// connection manager, not in the transport.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    /// Inbound frame stream for one socket.
    type Reader: Stream<Item = std::result::Result<Message, WsError>> + Send + Unpin + 'static;

    /// Outbound frame sink for one socket.
    type Writer: Sink<Message, Error = WsError> + Send + Unpin + 'static;

    /// Opens a socket to `url`.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the socket cannot be established.
    async fn connect(&self, url: &Url) -> Result<(Self::Reader, Self::Writer)>;
}

// ============================================================================
// TungsteniteTransport
// ============================================================================

/// Default transport backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// Creates the default transport.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    type Reader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
    type Writer = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

    async fn connect(&self, url: &Url) -> Result<(Self::Reader, Self::Writer)> {
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        debug!(status = %response.status(), "websocket handshake completed");

        let (writer, reader) = stream.split();
        Ok((reader, writer))
    }
}
