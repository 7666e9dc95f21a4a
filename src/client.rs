//! Realtime client facade.
//!
//! [`RealtimeClient`] is the public handle over the connection manager. It
//! is cheap to clone and `Send + Sync`: every clone talks to the same actor
//! task, the same handler registry, and the same status broadcaster.
//!
//! # Lifecycle
//!
//! The constructor spawns the connection actor but opens no socket;
//! [`RealtimeClient::connect`] initiates the handshake and returns without
//! waiting for it. Connection progress is observed through
//! [`RealtimeClient::subscribe`] or polled with [`RealtimeClient::state`].
//! Transient network failures recover automatically with exponential
//! backoff, up to the configured attempt ceiling; exhaustion is silent, so
//! callers wanting an alarm should build one on `subscribe`. Call
//! [`RealtimeClient::disconnect`] before dropping the last handle for an
//! orderly teardown.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::config::RealtimeOptions;
use crate::dispatch::{ConnectionState, HandlerRegistry, StatusBroadcaster};
use crate::error::{Error, Result};
use crate::identifiers::{HandlerId, SubscriberId};
use crate::protocol::{Envelope, MessageType};
use crate::transport::connection::{ConnectionActor, ConnectionEvent};
use crate::transport::{Transport, TungsteniteTransport};

// ============================================================================
// RealtimeClient
// ============================================================================

/// Handle to one logical realtime connection.
///
/// # Thread Safety
///
/// `RealtimeClient` is `Send + Sync` and can be shared across tasks. All
/// operations are non-blocking; `connect` and `disconnect` return after
/// enqueuing the request with the connection actor.
///
/// # Example
///
/// ```no_run
/// use nyx_realtime::{MessageType, RealtimeClient, RealtimeOptions, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = RealtimeClient::new(RealtimeOptions::new("ws://localhost:3000/ws"))?;
///
///     client.subscribe(|state| println!("connection: {state}"));
///     client.register(MessageType::Alert, |envelope| {
///         println!("alert: {}", envelope.get_str("message"));
///     });
///
///     client.connect(Some("secret-token"));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RealtimeClient<T: Transport = TungsteniteTransport> {
    events: mpsc::UnboundedSender<ConnectionEvent<T::Writer>>,
    registry: Arc<HandlerRegistry>,
    status: Arc<StatusBroadcaster>,
}

impl<T: Transport> std::fmt::Debug for RealtimeClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient").finish_non_exhaustive()
    }
}

impl RealtimeClient<TungsteniteTransport> {
    /// Creates a client over the default tokio-tungstenite transport.
    ///
    /// Spawns the connection actor; must be called inside a tokio runtime.
    /// No socket is opened until [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured URL is invalid or not a
    /// `ws`/`wss` endpoint.
    pub fn new(options: RealtimeOptions) -> Result<Self> {
        Self::with_transport(options, TungsteniteTransport::new())
    }
}

impl<T: Transport> RealtimeClient<T> {
    /// Creates a client over a caller-supplied transport.
    ///
    /// Used by tests to inject [`MockTransport`](crate::testing::MockTransport).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured URL is invalid or not a
    /// `ws`/`wss` endpoint.
    pub fn with_transport(options: RealtimeOptions, transport: T) -> Result<Self> {
        let url = Url::parse(&options.url)
            .map_err(|e| Error::config(format!("invalid URL `{}`: {e}", options.url)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "unsupported URL scheme `{}`; expected ws or wss",
                url.scheme()
            )));
        }

        let registry = Arc::new(HandlerRegistry::new());
        let status = Arc::new(StatusBroadcaster::new());
        let events = ConnectionActor::spawn(
            options,
            transport,
            url,
            Arc::clone(&registry),
            Arc::clone(&status),
        );

        Ok(Self {
            events,
            registry,
            status,
        })
    }

    // ========================================================================
    // Connection Control
    // ========================================================================

    /// Initiates a connection, optionally authenticating with a token.
    ///
    /// The token is appended to the connect URL as a `token` query
    /// parameter and retained for automatic reconnects. Returns
    /// immediately; progress is observed via [`subscribe`](Self::subscribe).
    /// A call while a socket is already live or connecting is a logged
    /// no-op.
    pub fn connect(&self, token: Option<&str>) {
        let _ = self.events.send(ConnectionEvent::UserConnect {
            token: token.map(str::to_owned),
        });
    }

    /// Tears the connection down and suppresses automatic reconnection.
    ///
    /// Unconditionally effective: cancels any armed reconnect timer, stops
    /// the heartbeat, and closes the socket if open. Reconnection resumes
    /// only on the next [`connect`](Self::connect) call.
    pub fn disconnect(&self) {
        let _ = self.events.send(ConnectionEvent::UserDisconnect);
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.current()
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Transmits an envelope, reporting whether it was handed to the
    /// transport.
    ///
    /// Returns `false` without error if the connection is not currently
    /// open, or if serialization or transmission fails. A `true` return
    /// means local hand-off only; there is no remote acknowledgment.
    pub async fn send(&self, envelope: Envelope) -> bool {
        let (reply, outcome) = oneshot::channel();
        if self
            .events
            .send(ConnectionEvent::UserSend { envelope, reply })
            .is_err()
        {
            return false;
        }
        outcome.await.unwrap_or(false)
    }

    /// Sends a `ping` envelope stamped with the current time.
    pub async fn ping(&self) -> bool {
        self.send(Envelope::ping()).await
    }

    // ========================================================================
    // Message Handlers
    // ========================================================================

    /// Registers a handler for a message type.
    ///
    /// All handlers registered for a type receive each message of that
    /// type, in registration order. See
    /// [`HandlerRegistry::register`](crate::dispatch::HandlerRegistry::register).
    pub fn register(
        &self,
        kind: MessageType,
        handler: impl Fn(&Envelope) + Send + Sync + 'static,
    ) -> HandlerId {
        self.registry.register(kind, handler)
    }

    /// Removes a previously registered handler. No-op if absent.
    pub fn unregister(&self, kind: &MessageType, id: HandlerId) {
        self.registry.unregister(kind, id);
    }

    // ========================================================================
    // Status Subscription
    // ========================================================================

    /// Subscribes to connection-state changes.
    ///
    /// The subscriber is invoked once with the current state before this
    /// method returns, then on every subsequent transition.
    pub fn subscribe(
        &self,
        handler: impl Fn(ConnectionState) + Send + Sync + 'static,
    ) -> SubscriberId {
        self.status.subscribe(handler)
    }

    /// Removes a status subscriber. No-op if absent.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.status.unsubscribe(id);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio_tungstenite::tungstenite::Message;

    use crate::testing::{MockServer, MockSocket, MockTransport};

    fn test_options() -> RealtimeOptions {
        RealtimeOptions::new("ws://localhost:3000/ws")
    }

    /// Subscribes a channel-backed status observer; the first received item
    /// is the replayed current state.
    fn status_channel(
        client: &RealtimeClient<MockTransport>,
    ) -> mpsc::UnboundedReceiver<ConnectionState> {
        let (tx, rx) = mpsc::unbounded_channel();
        client.subscribe(move |state| {
            let _ = tx.send(state);
        });
        rx
    }

    /// Connects with the given token and drives the handshake to Connected.
    async fn connect_client(
        client: &RealtimeClient<MockTransport>,
        server: &mut MockServer,
        states: &mut mpsc::UnboundedReceiver<ConnectionState>,
        token: Option<&str>,
    ) -> MockSocket {
        client.connect(token);
        let socket = server.accept().await.expect("connection accepted");
        assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
        assert_eq!(states.recv().await, Some(ConnectionState::Connected));
        socket
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_reports_connecting_then_connected() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");

        let mut states = status_channel(&client);
        assert_eq!(states.recv().await, Some(ConnectionState::Disconnected));

        let socket = connect_client(&client, &mut server, &mut states, Some("abc")).await;
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(socket.url().query(), Some("token=abc"));
    }

    #[tokio::test]
    async fn test_send_while_disconnected_returns_false() {
        let (transport, _server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");

        assert!(!client.send(Envelope::new(MessageType::Alert)).await);
        assert!(!client.ping().await);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_delivers_serialized_envelope() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let mut socket = connect_client(&client, &mut server, &mut states, None).await;

        let sent = client
            .send(Envelope::new(MessageType::StatusUpdate).with_field("profileId", "p-1"))
            .await;
        assert!(sent);

        let frame = socket.recv().await.expect("outbound frame");
        let Message::Text(text) = frame else {
            panic!("expected text frame, got {frame:?}");
        };
        let envelope = Envelope::from_json(text.as_str()).expect("decode");
        assert_eq!(envelope.kind, MessageType::StatusUpdate);
        assert_eq!(envelope.get_str("profileId"), "p-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_dispatch_isolates_panicking_handler() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let socket = connect_client(&client, &mut server, &mut states, None).await;

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        client.register(MessageType::Alert, |_| panic!("boom"));
        client.register(MessageType::Alert, move |envelope| {
            let _ = seen_tx.send(envelope.get_str("message").to_string());
        });

        socket.send_text(r#"{"type":"alert","message":"x"}"#);
        socket.send_text(r#"{"type":"alert","message":"y"}"#);

        // The surviving handler saw each envelope exactly once, in order,
        // despite the first handler panicking every time.
        assert_eq!(seen_rx.recv().await.as_deref(), Some("x"));
        assert_eq!(seen_rx.recv().await.as_deref(), Some("y"));
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_dropped_without_side_effects() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let socket = connect_client(&client, &mut server, &mut states, None).await;

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        client.register(MessageType::Alert, move |envelope| {
            let _ = seen_tx.send(envelope.get_str("message").to_string());
        });

        socket.send_text("{this is not json");
        socket.send_text(r#"{"missing":"type field"}"#);
        socket.send_text(r#"{"type":"alert","message":"after"}"#);

        // Only the well-formed frame reached the handler; ordering proves
        // the malformed ones were dropped rather than queued.
        assert_eq!(seen_rx.recv().await.as_deref(), Some("after"));
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsolicited_close_reconnects_with_backoff() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let socket = connect_client(&client, &mut server, &mut states, Some("abc")).await;

        let before_drop = tokio::time::Instant::now();
        socket.close();
        assert_eq!(states.recv().await, Some(ConnectionState::Disconnected));

        let socket2 = server.accept().await.expect("reconnected");
        assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
        assert_eq!(states.recv().await, Some(ConnectionState::Connected));

        // First reconnect waits the base interval (3000ms).
        let waited = before_drop.elapsed();
        assert!(waited >= Duration::from_millis(3000), "waited {waited:?}");
        assert!(waited < Duration::from_millis(4500), "waited {waited:?}");

        // The stored token is reused automatically.
        assert_eq!(socket2.url().query(), Some("token=abc"));

        // The attempt counter reset on reconnect: a second drop waits the
        // base interval again rather than the second backoff step.
        let before_second_drop = tokio::time::Instant::now();
        socket2.close();
        assert_eq!(states.recv().await, Some(ConnectionState::Disconnected));
        let _socket3 = server.accept().await.expect("reconnected again");
        assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
        assert_eq!(states.recv().await, Some(ConnectionState::Connected));

        let waited = before_second_drop.elapsed();
        assert!(waited >= Duration::from_millis(3000), "waited {waited:?}");
        assert!(waited < Duration::from_millis(4500), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_error_reports_error_state_and_recovers() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let socket = connect_client(&client, &mut server, &mut states, None).await;

        socket.fail("connection reset by peer");
        assert_eq!(states.recv().await, Some(ConnectionState::Error));

        let _socket2 = server.accept().await.expect("reconnected");
        assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
        assert_eq!(states.recv().await, Some(ConnectionState::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_armed_reconnect_timer() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let socket = connect_client(&client, &mut server, &mut states, None).await;

        socket.close();
        assert_eq!(states.recv().await, Some(ConnectionState::Disconnected));

        // The reconnect timer is armed; disconnect must defuse it.
        client.disconnect();

        tokio::time::sleep(Duration::from_millis(2 * 3000 + 500)).await;
        assert_eq!(server.connect_count(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_stops_after_attempt_ceiling() {
        let (transport, mut server) = MockTransport::pair();
        server.refuse_connections(true);

        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;

        client.connect(None);

        // The caller-initiated attempt plus five automatic retries, each
        // visible as Connecting then Error.
        for attempt in 0..6 {
            assert_eq!(
                states.recv().await,
                Some(ConnectionState::Connecting),
                "attempt {attempt}"
            );
            assert_eq!(
                states.recv().await,
                Some(ConnectionState::Error),
                "attempt {attempt}"
            );
        }

        // Long after the last backoff delay: no further attempts.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(server.connect_count(), 6);
        assert!(states.try_recv().is_err());

        // An explicit connect starts a fresh attempt.
        server.refuse_connections(false);
        client.connect(None);
        assert!(server.accept().await.is_some());
        assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
        assert_eq!(states.recv().await, Some(ConnectionState::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_while_live_is_noop() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let _socket = connect_client(&client, &mut server, &mut states, None).await;

        client.connect(None);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(server.connect_count(), 1);
        assert!(states.try_recv().is_err(), "no state flicker expected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_pings_while_connected() {
        let (transport, mut server) = MockTransport::pair();
        let options = test_options().with_ping_interval(Duration::from_secs(1));
        let client = RealtimeClient::with_transport(options, transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let mut socket = connect_client(&client, &mut server, &mut states, None).await;

        for _ in 0..3 {
            let frame = socket.recv().await.expect("heartbeat frame");
            let Message::Text(text) = frame else {
                panic!("expected text frame, got {frame:?}");
            };
            let envelope = Envelope::from_json(text.as_str()).expect("decode");
            assert_eq!(envelope.kind, MessageType::Ping);
            assert!(envelope.get_u64("timestamp") > 0);
        }

        client.disconnect();
        assert_eq!(states.recv().await, Some(ConnectionState::Disconnected));

        // The close frame is the last thing written; no pings follow.
        match socket.recv_timeout(Duration::from_secs(5)).await {
            Some(Message::Close(_)) => {}
            other => panic!("expected close frame, got {other:?}"),
        }
        assert!(socket.recv_timeout(Duration::from_secs(5)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_subscriber_sees_connected_immediately() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let _socket = connect_client(&client, &mut server, &mut states, None).await;

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_clone = std::sync::Arc::clone(&seen);
        client.subscribe(move |state| seen_clone.lock().push(state));

        // Replayed synchronously at subscription, before any transition.
        assert_eq!(*seen.lock(), vec![ConnectionState::Connected]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_handler_no_longer_invoked() {
        let (transport, mut server) = MockTransport::pair();
        let client = RealtimeClient::with_transport(test_options(), transport).expect("client");
        let mut states = status_channel(&client);
        states.recv().await;
        let socket = connect_client(&client, &mut server, &mut states, None).await;

        let (dead_tx, mut dead_rx) = mpsc::unbounded_channel();
        let id = client.register(MessageType::Notification, move |_| {
            let _ = dead_tx.send(());
        });
        client.unregister(&MessageType::Notification, id);

        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        client.register(MessageType::Notification, move |_| {
            let _ = live_tx.send(());
        });

        socket.send_text(r#"{"type":"notification","title":"t"}"#);
        live_rx.recv().await.expect("surviving handler ran");
        assert!(dead_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let (transport, _server) = MockTransport::pair();
        let err = RealtimeClient::with_transport(
            RealtimeOptions::new("http://localhost:3000"),
            transport.clone(),
        )
        .expect_err("scheme should be rejected");
        assert!(matches!(err, Error::Config { .. }));

        let err = RealtimeClient::with_transport(RealtimeOptions::new("not a url"), transport)
            .expect_err("garbage should be rejected");
        assert!(matches!(err, Error::Config { .. }));
    }
}
