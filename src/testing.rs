//! Reusable test utilities for exercising the client without a real socket.
//!
//! [`MockTransport`] satisfies the [`Transport`](crate::transport::Transport)
//! seam with in-memory channels. Tests obtain the paired [`MockServer`] to
//! accept connections, read frames the client wrote, push inbound frames,
//! refuse connection attempts, or drop the socket — including across
//! reconnects, since every `connect` call produces a fresh [`MockSocket`].

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

use crate::error::{Error, Result};
use crate::transport::Transport;

// ============================================================================
// MockTransport
// ============================================================================

/// Transport backed by in-memory channels.
///
/// Create it with [`MockTransport::pair`] to obtain both the transport for
/// the client and the [`MockServer`] handle driven by the test.
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<MockShared>,
}

struct MockShared {
    accept_tx: mpsc::UnboundedSender<MockSocket>,
    state: Mutex<MockState>,
}

struct MockState {
    scripted_refusals: VecDeque<String>,
    refuse_all: bool,
    connect_urls: Vec<Url>,
}

impl MockTransport {
    /// Builds a transport + server control pair.
    #[must_use]
    pub fn pair() -> (Self, MockServer) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(MockShared {
            accept_tx,
            state: Mutex::new(MockState {
                scripted_refusals: VecDeque::new(),
                refuse_all: false,
                connect_urls: Vec::new(),
            }),
        });

        let server = MockServer {
            accept_rx,
            shared: Arc::clone(&shared),
        };
        (Self { shared }, server)
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;

    async fn connect(&self, url: &Url) -> Result<(Self::Reader, Self::Writer)> {
        {
            let mut state = self.shared.state.lock();
            state.connect_urls.push(url.clone());
            if state.refuse_all {
                return Err(Error::connection("mock transport refusing connections"));
            }
            if let Some(reason) = state.scripted_refusals.pop_front() {
                return Err(Error::connection(reason));
            }
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let socket = MockSocket {
            inbound_tx,
            outbound_rx,
            url: url.clone(),
        };
        self.shared
            .accept_tx
            .send(socket)
            .map_err(|_| Error::connection("mock server dropped"))?;

        Ok((
            MockReader { rx: inbound_rx },
            MockWriter { tx: outbound_tx },
        ))
    }
}

// ============================================================================
// MockServer
// ============================================================================

/// Server-side test handle paired with [`MockTransport`].
pub struct MockServer {
    accept_rx: mpsc::UnboundedReceiver<MockSocket>,
    shared: Arc<MockShared>,
}

impl MockServer {
    /// Waits for the client's next connection attempt to succeed.
    pub async fn accept(&mut self) -> Option<MockSocket> {
        self.accept_rx.recv().await
    }

    /// Waits for a connection with a timeout.
    pub async fn accept_timeout(&mut self, timeout: Duration) -> Option<MockSocket> {
        tokio::time::timeout(timeout, self.accept_rx.recv())
            .await
            .unwrap_or_default()
    }

    /// Scripts the next `count` connection attempts to fail.
    pub fn refuse_next(&self, count: u32) {
        let mut state = self.shared.state.lock();
        for _ in 0..count {
            state
                .scripted_refusals
                .push_back("mock connect refused".to_string());
        }
    }

    /// Makes every connection attempt fail until re-enabled.
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.state.lock().refuse_all = refuse;
    }

    /// Returns the number of connection attempts observed so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.shared.state.lock().connect_urls.len()
    }

    /// Returns the URLs of all connection attempts observed so far.
    #[must_use]
    pub fn connect_urls(&self) -> Vec<Url> {
        self.shared.state.lock().connect_urls.clone()
    }
}

// ============================================================================
// MockSocket
// ============================================================================

/// One accepted connection, driven by the test.
pub struct MockSocket {
    inbound_tx: mpsc::UnboundedSender<std::result::Result<Message, WsError>>,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
    url: Url,
}

impl MockSocket {
    /// Returns the URL the client connected with.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Pushes a UTF-8 payload to the client as a text frame.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.inbound_tx
            .send(Ok(Message::text(text.into())))
            .is_ok()
    }

    /// Simulates a server-initiated close.
    pub fn close(&self) {
        let _ = self.inbound_tx.send(Ok(Message::Close(None)));
    }

    /// Simulates a transport error on the socket.
    pub fn fail(&self, cause: &str) {
        let _ = self
            .inbound_tx
            .send(Err(WsError::Io(std::io::Error::other(cause.to_string()))));
    }

    /// Receives the next frame the client wrote.
    pub async fn recv(&mut self) -> Option<Message> {
        self.outbound_rx.recv().await
    }

    /// Receives a frame with a timeout.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Message> {
        tokio::time::timeout(timeout, self.outbound_rx.recv())
            .await
            .unwrap_or_default()
    }
}

// ============================================================================
// MockReader / MockWriter
// ============================================================================

/// Reader side for [`MockTransport`].
pub struct MockReader {
    rx: mpsc::UnboundedReceiver<std::result::Result<Message, WsError>>,
}

impl Stream for MockReader {
    type Item = std::result::Result<Message, WsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_recv(cx)
    }
}

/// Writer side for [`MockTransport`].
pub struct MockWriter {
    tx: mpsc::UnboundedSender<Message>,
}

impl Sink<Message> for MockWriter {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> std::result::Result<(), WsError> {
        self.tx.send(item).map_err(|_| WsError::ConnectionClosed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refusal_script_consumed_in_order() {
        let (transport, server) = MockTransport::pair();
        server.refuse_next(1);

        let url = Url::parse("ws://localhost:3000/ws").expect("url");
        assert!(transport.connect(&url).await.is_err());
        assert!(transport.connect(&url).await.is_ok());
        assert_eq!(server.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let (transport, mut server) = MockTransport::pair();
        let url = Url::parse("ws://localhost:3000/ws").expect("url");

        let (mut reader, mut writer) = transport.connect(&url).await.expect("connect");
        let mut socket = server.accept().await.expect("accepted");

        use futures_util::{SinkExt, StreamExt};
        writer
            .send(Message::text(r#"{"type":"ping"}"#))
            .await
            .expect("send");
        let written = socket.recv().await.expect("frame");
        assert!(matches!(written, Message::Text(_)));

        assert!(socket.send_text(r#"{"type":"pong"}"#));
        let inbound = reader.next().await.expect("frame").expect("ok");
        assert!(matches!(inbound, Message::Text(_)));
    }
}
