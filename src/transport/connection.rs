//! Connection manager: event loop and state machine.
//!
//! This module owns the connection lifecycle. A single actor task holds all
//! mutable connection state (socket writer, heartbeat, reconnect attempts,
//! stored token) and consumes a closed set of events over one channel, so
//! state transitions, timer firings, and inbound dispatch never interleave.
//!
//! # Event Loop
//!
//! The actor receives:
//!
//! - User commands from [`RealtimeClient`](crate::client::RealtimeClient):
//!   connect, disconnect, send
//! - Socket events from the spawned connect/read tasks: opened, frame,
//!   closed, errored
//! - Timer events: reconnect timer fired, heartbeat tick
//!
//! # Generations
//!
//! Socket and timer events are tagged with the generation (`epoch`) they
//! were created under. `disconnect()` and every new connect attempt bump
//! the generation, so an event from a dead socket or a cancelled timer is
//! recognized and ignored even if it was already in flight. This is what
//! makes `disconnect()` unconditionally effective.
//!
//! # Reconnect Policy
//!
//! An unsolicited close or error schedules a reconnect with exponential
//! backoff, up to the configured attempt ceiling. Exhaustion is silent: the
//! manager stays in its last published state and waits for the caller to
//! invoke connect again. The attempt counter resets only on a successful
//! `Connected` transition.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::RealtimeOptions;
use crate::dispatch::{ConnectionState, HandlerRegistry, StatusBroadcaster};
use crate::protocol::Envelope;

use super::backoff::delay_for_attempt;
use super::heartbeat::Heartbeat;
use super::socket::Transport;

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Events processed by the connection actor.
pub(crate) enum ConnectionEvent<W> {
    /// Caller requested a connection.
    UserConnect {
        /// Auth token to append to the connect URL, if given.
        token: Option<String>,
    },
    /// Caller requested a teardown.
    UserDisconnect,
    /// Caller wants an envelope transmitted.
    UserSend {
        /// Envelope to serialize and transmit.
        envelope: Envelope,
        /// Delivery outcome reported back to the caller.
        reply: oneshot::Sender<bool>,
    },
    /// Socket handshake completed.
    Opened {
        /// Generation of the connect attempt.
        epoch: u64,
        /// Outbound sink for the new socket.
        writer: W,
    },
    /// Text frame arrived on the socket.
    FrameReceived {
        /// Generation of the originating socket.
        epoch: u64,
        /// Raw frame text.
        text: String,
    },
    /// Socket closed.
    Closed {
        /// Generation of the originating socket.
        epoch: u64,
        /// Close detail, if the remote supplied one.
        reason: Option<String>,
    },
    /// Socket reported an error or could not be constructed.
    Errored {
        /// Generation of the originating socket or attempt.
        epoch: u64,
        /// Error description.
        cause: String,
    },
    /// Armed reconnect timer fired.
    ReconnectTimer {
        /// Generation the timer was armed under.
        epoch: u64,
    },
    /// Heartbeat period elapsed.
    HeartbeatTick {
        /// Generation of the connection the heartbeat belongs to.
        epoch: u64,
    },
}

// ============================================================================
// ConnectionActor
// ============================================================================

/// Owns the socket, the timers, and the state machine.
///
/// Constructed via [`ConnectionActor::spawn`], which returns the event
/// sender used by the client facade. The actor stops when every sender is
/// dropped, releasing the socket and cancelling timers.
pub(crate) struct ConnectionActor<T: Transport> {
    options: RealtimeOptions,
    transport: T,
    url: Url,
    registry: Arc<HandlerRegistry>,
    status: Arc<StatusBroadcaster>,
    /// Weak handle for spawned tasks; the channel closes when the last
    /// client handle drops, not while the actor itself is alive.
    events: mpsc::WeakUnboundedSender<ConnectionEvent<T::Writer>>,
    writer: Option<T::Writer>,
    heartbeat: Heartbeat,
    token: Option<String>,
    attempts: u32,
    epoch: u64,
}

impl<T: Transport> ConnectionActor<T> {
    /// Spawns the actor task and returns its event sender.
    pub(crate) fn spawn(
        options: RealtimeOptions,
        transport: T,
        url: Url,
        registry: Arc<HandlerRegistry>,
        status: Arc<StatusBroadcaster>,
    ) -> mpsc::UnboundedSender<ConnectionEvent<T::Writer>> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = Self {
            options,
            transport,
            url,
            registry,
            status,
            events: events_tx.downgrade(),
            writer: None,
            heartbeat: Heartbeat::new(),
            token: None,
            attempts: 0,
            epoch: 0,
        };
        tokio::spawn(actor.run(events_rx));

        events_tx
    }

    /// Event loop: runs until every client handle is dropped.
    async fn run(mut self, mut events_rx: mpsc::UnboundedReceiver<ConnectionEvent<T::Writer>>) {
        while let Some(event) = events_rx.recv().await {
            self.handle_event(event).await;
        }

        // Last client handle dropped: release the socket and timers.
        self.epoch += 1;
        self.heartbeat.stop();
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.send(Message::Close(None)).await;
        }
        debug!("connection manager stopped");
    }

    async fn handle_event(&mut self, event: ConnectionEvent<T::Writer>) {
        match event {
            ConnectionEvent::UserConnect { token } => self.handle_user_connect(token),
            ConnectionEvent::UserDisconnect => self.handle_user_disconnect().await,
            ConnectionEvent::UserSend { envelope, reply } => {
                let delivered = self.try_send(&envelope).await;
                let _ = reply.send(delivered);
            }
            ConnectionEvent::Opened { epoch, writer } => self.handle_opened(epoch, writer),
            ConnectionEvent::FrameReceived { epoch, text } => self.handle_frame(epoch, &text),
            ConnectionEvent::Closed { epoch, reason } => self.handle_closed(epoch, reason),
            ConnectionEvent::Errored { epoch, cause } => self.handle_errored(epoch, &cause),
            ConnectionEvent::ReconnectTimer { epoch } => self.handle_reconnect_timer(epoch),
            ConnectionEvent::HeartbeatTick { epoch } => self.handle_heartbeat_tick(epoch).await,
        }
    }

    // ========================================================================
    // User commands
    // ========================================================================

    fn handle_user_connect(&mut self, token: Option<String>) {
        let state = self.status.current();
        if matches!(
            state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(state = %state, "connect ignored; socket already live or connecting");
            return;
        }

        if token.is_some() {
            self.token = token;
        }
        self.start_attempt();
    }

    async fn handle_user_disconnect(&mut self) {
        // Bumping the generation cancels the armed reconnect timer and
        // orphans any socket event already in flight.
        self.epoch += 1;
        self.heartbeat.stop();

        if let Some(mut writer) = self.writer.take() {
            if writer.send(Message::Close(None)).await.is_err() {
                debug!("close frame could not be delivered; dropping socket");
            }
        }

        self.status.publish(ConnectionState::Disconnected);
        debug!("disconnected by caller");
    }

    async fn try_send(&mut self, envelope: &Envelope) -> bool {
        let state = self.status.current();
        if state != ConnectionState::Connected {
            debug!(kind = %envelope.kind, state = %state, "send skipped; not connected");
            return false;
        }
        let Some(writer) = self.writer.as_mut() else {
            debug!(kind = %envelope.kind, "send skipped; no socket");
            return false;
        };

        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, kind = %envelope.kind, "failed to serialize outbound envelope");
                return false;
            }
        };

        match writer.send(Message::Text(json.into())).await {
            Ok(()) => {
                if self.options.debug {
                    debug!(kind = %envelope.kind, "envelope sent");
                }
                true
            }
            Err(err) => {
                warn!(error = %err, kind = %envelope.kind, "failed to transmit envelope");
                false
            }
        }
    }

    // ========================================================================
    // Socket events
    // ========================================================================

    fn handle_opened(&mut self, epoch: u64, writer: T::Writer) {
        if epoch != self.epoch {
            // The attempt was superseded while the handshake was in flight;
            // dropping the writer closes the stale socket.
            trace!(epoch, current = self.epoch, "ignoring stale socket open");
            return;
        }

        info!(url = %self.url, "connection established");
        self.writer = Some(writer);
        self.attempts = 0;

        let events = self.events.clone();
        self.heartbeat.start(self.options.ping_interval, move || {
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(ConnectionEvent::HeartbeatTick { epoch });
            }
        });

        self.status.publish(ConnectionState::Connected);
    }

    fn handle_frame(&mut self, epoch: u64, text: &str) {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, "ignoring frame from stale socket");
            return;
        }

        match Envelope::from_json(text) {
            Ok(envelope) => {
                if self.options.debug {
                    debug!(kind = %envelope.kind, "dispatching inbound message");
                }
                self.registry.dispatch(&envelope);
            }
            Err(err) => {
                warn!(error = %err, "dropping malformed inbound frame");
            }
        }
    }

    fn handle_closed(&mut self, epoch: u64, reason: Option<String>) {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, "ignoring close from stale socket");
            return;
        }

        warn!(
            reason = reason.as_deref().unwrap_or("stream ended"),
            "connection closed by remote"
        );
        self.handle_socket_loss(ConnectionState::Disconnected);
    }

    fn handle_errored(&mut self, epoch: u64, cause: &str) {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, "ignoring error from stale socket");
            return;
        }

        warn!(error = %cause, "connection error");
        self.handle_socket_loss(ConnectionState::Error);
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn handle_reconnect_timer(&mut self, epoch: u64) {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, "ignoring cancelled reconnect timer");
            return;
        }
        let state = self.status.current();
        if matches!(
            state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(state = %state, "reconnect timer fired while socket live; ignoring");
            return;
        }

        debug!(attempt = self.attempts, "reconnect timer fired");
        self.start_attempt();
    }

    async fn handle_heartbeat_tick(&mut self, epoch: u64) {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, "ignoring heartbeat tick from stale timer");
            return;
        }

        if !self.try_send(&Envelope::ping()).await {
            debug!("heartbeat ping not delivered");
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Opens a socket under a fresh generation.
    fn start_attempt(&mut self) {
        self.epoch += 1;
        let epoch = self.epoch;
        let url = self.connect_url();

        if self.options.debug {
            debug!(url = %self.url, epoch, "opening socket");
        }
        self.status.publish(ConnectionState::Connecting);

        let Some(events) = self.events.upgrade() else {
            return;
        };
        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.connect(&url).await {
                Ok((reader, writer)) => {
                    if events
                        .send(ConnectionEvent::Opened { epoch, writer })
                        .is_err()
                    {
                        return;
                    }
                    read_loop(reader, epoch, events).await;
                }
                Err(err) => {
                    let _ = events.send(ConnectionEvent::Errored {
                        epoch,
                        cause: err.to_string(),
                    });
                }
            }
        });
    }

    /// Common teardown for an unsolicited close or error.
    fn handle_socket_loss(&mut self, state: ConnectionState) {
        // Orphan any straggler events still queued from the dead socket.
        self.epoch += 1;
        self.writer = None;
        self.heartbeat.stop();
        self.status.publish(state);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.attempts >= self.options.max_reconnect_attempts {
            warn!(
                attempts = self.attempts,
                "reconnect attempts exhausted; waiting for an explicit connect"
            );
            return;
        }

        self.attempts += 1;
        let delay = delay_for_attempt(
            self.options.reconnect_interval,
            self.options.backoff_factor,
            self.attempts,
        );
        info!(
            attempt = self.attempts,
            max = self.options.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        let epoch = self.epoch;
        let Some(events) = self.events.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ConnectionEvent::ReconnectTimer { epoch });
        });
    }

    /// Builds the connect URL, appending the stored token if any.
    fn connect_url(&self) -> Url {
        let mut url = self.url.clone();
        if let Some(token) = self.token.as_deref() {
            url.query_pairs_mut().append_pair("token", token);
        }
        url
    }
}

// ============================================================================
// Read Loop
// ============================================================================

/// Forwards inbound frames to the actor until the socket dies.
async fn read_loop<R, W>(
    mut reader: R,
    epoch: u64,
    events: mpsc::UnboundedSender<ConnectionEvent<W>>,
) where
    R: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    while let Some(item) = reader.next().await {
        match item {
            Ok(Message::Text(text)) => {
                let frame = ConnectionEvent::FrameReceived {
                    epoch,
                    text: text.to_string(),
                };
                if events.send(frame).is_err() {
                    return;
                }
            }

            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| {
                    format!("code={} reason={}", u16::from(f.code), f.reason.as_str())
                });
                let _ = events.send(ConnectionEvent::Closed { epoch, reason });
                return;
            }

            // Binary, Ping, and Pong frames are not envelopes.
            Ok(_) => {}

            Err(err) => {
                let _ = events.send(ConnectionEvent::Errored {
                    epoch,
                    cause: err.to_string(),
                });
                return;
            }
        }
    }

    let _ = events.send(ConnectionEvent::Closed {
        epoch,
        reason: None,
    });
}
