//! Push channel session.
//!
//! [`PushSession`] turns incoming frames into replies and [`PushEvent`]s
//! without touching the network. [`PushClient`] adds reconnection and hands
//! events to an [`EventHandler`]; the browser binding feeds it frames from a
//! WebSocket.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{EnginePacket, ProtocolError, SocketPacket, SocketPacketKind, DEFAULT_NAMESPACE};
use crate::error::StorefrontError;
use crate::ids::OrderId;
use crate::notify::OrderUpdate;
use crate::reconnect::{Backoff, ReconnectPolicy};

/// Event pushed by the server for order status changes.
pub const ORDER_UPDATE_EVENT: &str = "order_update";

/// Event the server sends after a connection is accepted.
pub const SERVER_ACK_EVENT: &str = "server_ack";

/// Event confirming a room join.
pub const JOINED_EVENT: &str = "joined";

/// Event asking the server to add us to an order's room.
pub const JOIN_ORDER_ROOM_EVENT: &str = "join_order_room";

/// Why the channel went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server ended the session. Not retried.
    ServerDisconnect,
    /// The underlying connection closed.
    TransportClose,
    /// The server refused the namespace connection.
    ConnectError,
}

impl DisconnectReason {
    /// Whether the client should try again.
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, Self::ServerDisconnect)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerDisconnect => write!(f, "server disconnect"),
            Self::TransportClose => write!(f, "transport close"),
            Self::ConnectError => write!(f, "connect error"),
        }
    }
}

/// Something the server told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// Namespace connection accepted.
    Connected { sid: Option<String> },
    /// An order changed status.
    OrderUpdate(OrderUpdate),
    /// Greeting sent after connect.
    ServerAck { message: String },
    /// Room join confirmed.
    Joined { room: String },
    /// Connection lost.
    Disconnected { reason: DisconnectReason },
    /// Namespace connection refused.
    ConnectError { message: String },
    /// Any other event name.
    Other { name: String },
}

/// Receives decoded push events.
pub trait EventHandler {
    fn handle(&self, event: PushEvent);
}

/// Sends frames to the server.
pub trait FrameSink {
    fn send_frame(&self, frame: &str) -> Result<(), StorefrontError>;
}

/// Build the WebSocket URL for the push endpoint on the page's origin.
///
/// `protocol` is the page's `location.protocol` (`"https:"` or `"http:"`),
/// `host` its `location.host`.
pub fn socket_url(protocol: &str, host: &str, path: &str) -> String {
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    let path = if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    };
    format!("{}://{}{}?EIO=4&transport=websocket", scheme, host, path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingOpen,
    Connecting,
    Connected,
    ClosedByServer,
    Closed,
}

/// Frames to send and events to deliver after one incoming frame.
#[derive(Debug, Default, PartialEq)]
pub struct SessionOutput {
    pub outgoing: Vec<String>,
    pub events: Vec<PushEvent>,
    /// Restart the heartbeat: the next ping must arrive within this long.
    pub heartbeat: Option<Duration>,
}

#[derive(Serialize)]
struct JoinOrderRoom {
    order_id: OrderId,
}

/// Protocol state for one connection.
#[derive(Debug)]
pub struct PushSession {
    state: SessionState,
    join_room: Option<OrderId>,
    heartbeat_timeout: Option<Duration>,
}

impl PushSession {
    /// Create a session that joins `join_room` once connected.
    pub fn new(join_room: Option<OrderId>) -> Self {
        Self {
            state: SessionState::AwaitingOpen,
            join_room,
            heartbeat_timeout: None,
        }
    }

    /// Start over on a fresh transport.
    pub fn reset(&mut self) {
        self.state = SessionState::AwaitingOpen;
        self.heartbeat_timeout = None;
    }

    /// Whether the namespace connection is up.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// How long the server may stay silent before the transport is
    /// considered dead: ping interval plus ping timeout from the handshake.
    pub fn heartbeat_timeout(&self) -> Option<Duration> {
        self.heartbeat_timeout
    }

    /// Process one incoming frame.
    pub fn receive(&mut self, frame: &str) -> Result<SessionOutput, ProtocolError> {
        let mut out = SessionOutput::default();

        match EnginePacket::decode(frame)? {
            EnginePacket::Open(handshake) => {
                debug!(
                    sid = %handshake.sid,
                    ping_interval_ms = handshake.ping_interval,
                    "engine handshake"
                );
                let timeout =
                    Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));
                self.heartbeat_timeout = Some(timeout);
                self.state = SessionState::Connecting;
                out.outgoing.push(SocketPacket::connect().to_frame());
                out.heartbeat = Some(timeout);
            }
            EnginePacket::Ping(data) => {
                out.outgoing.push(EnginePacket::Pong(data).encode());
                out.heartbeat = self.heartbeat_timeout;
            }
            EnginePacket::Close => {
                if self.state == SessionState::Connected {
                    out.events.push(PushEvent::Disconnected {
                        reason: DisconnectReason::TransportClose,
                    });
                }
                self.state = SessionState::Closed;
            }
            EnginePacket::Message(body) => {
                let packet = SocketPacket::decode(&body)?;
                self.receive_packet(packet, &mut out)?;
            }
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }

        Ok(out)
    }

    fn receive_packet(
        &mut self,
        packet: SocketPacket,
        out: &mut SessionOutput,
    ) -> Result<(), ProtocolError> {
        if packet.namespace != DEFAULT_NAMESPACE {
            debug!(namespace = %packet.namespace, "ignoring packet for other namespace");
            return Ok(());
        }

        match packet.kind {
            SocketPacketKind::Connect => {
                let sid = packet
                    .data
                    .as_ref()
                    .and_then(|d| d.get("sid"))
                    .and_then(|s| s.as_str())
                    .map(str::to_string);
                self.state = SessionState::Connected;
                out.events.push(PushEvent::Connected { sid });

                if let Some(order_id) = self.join_room {
                    match self.emit(JOIN_ORDER_ROOM_EVENT, &JoinOrderRoom { order_id }) {
                        Ok(frame) => out.outgoing.push(frame),
                        Err(e) => warn!(error = %e, "could not encode room join"),
                    }
                }
            }
            SocketPacketKind::Disconnect => {
                self.state = SessionState::ClosedByServer;
                out.events.push(PushEvent::Disconnected {
                    reason: DisconnectReason::ServerDisconnect,
                });
            }
            SocketPacketKind::ConnectError => {
                let message = packet
                    .data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("connection refused")
                    .to_string();
                self.state = SessionState::Closed;
                out.events.push(PushEvent::ConnectError { message });
            }
            SocketPacketKind::Event => {
                out.events.push(decode_event(&packet)?);
            }
            SocketPacketKind::Ack => {
                debug!(ack_id = packet.ack_id.unwrap_or_default(), "ignoring ack");
            }
            SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck => {
                return Err(ProtocolError::Unsupported("binary attachments"));
            }
        }

        Ok(())
    }

    /// The transport went away. Returns the disconnect to report, if the
    /// session was up.
    pub fn transport_closed(&mut self) -> Option<PushEvent> {
        let event = match self.state {
            SessionState::Connected => Some(PushEvent::Disconnected {
                reason: DisconnectReason::TransportClose,
            }),
            _ => None,
        };
        if self.state != SessionState::ClosedByServer {
            self.state = SessionState::Closed;
        }
        event
    }

    /// Whether a dropped transport should be reopened.
    pub fn wants_reconnect(&self) -> bool {
        self.state != SessionState::ClosedByServer
    }

    /// Encode an event for sending. Fails unless connected.
    pub fn emit<P: Serialize>(&self, name: &str, payload: &P) -> Result<String, StorefrontError> {
        if !self.is_connected() {
            return Err(StorefrontError::NotConnected);
        }
        let payload = serde_json::to_value(payload)?;
        Ok(SocketPacket::event(name, payload).to_frame())
    }
}

fn decode_event(packet: &SocketPacket) -> Result<PushEvent, ProtocolError> {
    let (name, args) = packet.event_parts()?;
    let first = args.first().cloned().unwrap_or(serde_json::Value::Null);

    let event = match name {
        ORDER_UPDATE_EVENT => {
            let update: OrderUpdate = serde_json::from_value(first)
                .map_err(|e| ProtocolError::InvalidPayload(format!("order_update: {}", e)))?;
            PushEvent::OrderUpdate(update)
        }
        SERVER_ACK_EVENT => PushEvent::ServerAck {
            message: first
                .get("msg")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        JOINED_EVENT => PushEvent::Joined {
            room: first
                .get("room")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        other => PushEvent::Other {
            name: other.to_string(),
        },
    };

    Ok(event)
}

/// Push channel client: session state, reconnection and event delivery.
///
/// The owner feeds it transport callbacks; it never opens sockets itself.
pub struct PushClient<H> {
    session: RefCell<PushSession>,
    backoff: RefCell<Backoff>,
    heartbeat_epoch: Cell<u64>,
    handler: H,
}

/// A heartbeat deadline the owner must arm.
///
/// When `timeout` passes, the owner calls
/// [`PushClient::on_heartbeat_timeout`] with `epoch`. Later frames and
/// transport changes make older epochs stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub epoch: u64,
    pub timeout: Duration,
}

/// Result of a heartbeat deadline passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCheck {
    /// The server was heard from since; nothing to do.
    Alive,
    /// The transport is dead. Close it, then reopen after `reconnect_in`
    /// if set.
    Expired { reconnect_in: Option<Duration> },
}

impl<H: EventHandler> PushClient<H> {
    /// Create a client delivering events to `handler`.
    pub fn new(handler: H, policy: ReconnectPolicy, join_room: Option<OrderId>) -> Self {
        Self {
            session: RefCell::new(PushSession::new(join_room)),
            backoff: RefCell::new(Backoff::new(policy)),
            heartbeat_epoch: Cell::new(0),
            handler,
        }
    }

    /// Whether the namespace connection is up.
    pub fn is_connected(&self) -> bool {
        self.session.borrow().is_connected()
    }

    /// A new transport was opened.
    pub fn on_open(&self) {
        debug!("push transport open");
        self.bump_heartbeat();
        self.session.borrow_mut().reset();
    }

    fn bump_heartbeat(&self) -> u64 {
        let epoch = self.heartbeat_epoch.get().wrapping_add(1);
        self.heartbeat_epoch.set(epoch);
        epoch
    }

    /// A frame arrived. Returns a new heartbeat deadline to arm, if the
    /// frame restarted it.
    pub fn on_frame(&self, frame: &str, sink: &impl FrameSink) -> Option<Heartbeat> {
        let result = self.session.borrow_mut().receive(frame);
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "dropping undecodable push frame");
                return None;
            }
        };

        for reply in &output.outgoing {
            if let Err(e) = sink.send_frame(reply) {
                warn!(error = %e, "could not send push frame");
            }
        }

        for event in output.events {
            if let PushEvent::Connected { .. } = event {
                self.backoff.borrow_mut().reset();
            }
            self.handler.handle(event);
        }

        output.heartbeat.map(|timeout| Heartbeat {
            epoch: self.bump_heartbeat(),
            timeout,
        })
    }

    /// A heartbeat deadline passed.
    ///
    /// Unless a newer deadline was armed since, the transport is treated as
    /// closed and the reconnect delay is returned as for
    /// [`on_close`](Self::on_close).
    pub fn on_heartbeat_timeout(&self, epoch: u64, sample: f64) -> HeartbeatCheck {
        if epoch != self.heartbeat_epoch.get() {
            return HeartbeatCheck::Alive;
        }
        warn!("push channel heartbeat missed; closing transport");
        HeartbeatCheck::Expired {
            reconnect_in: self.on_close(sample),
        }
    }

    /// The transport closed. Returns the delay before reconnecting, or
    /// `None` to stay down.
    ///
    /// `sample` is a uniform random number in `[0, 1)` for backoff jitter.
    pub fn on_close(&self, sample: f64) -> Option<Duration> {
        self.bump_heartbeat();
        let (event, wants_reconnect) = {
            let mut session = self.session.borrow_mut();
            (session.transport_closed(), session.wants_reconnect())
        };

        if let Some(event) = event {
            self.handler.handle(event);
        }

        if !wants_reconnect {
            info!("push channel closed by server; not reconnecting");
            return None;
        }

        let mut backoff = self.backoff.borrow_mut();
        match backoff.next_delay(sample) {
            Some(delay) => {
                info!(
                    attempt = backoff.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling push reconnect"
                );
                Some(delay)
            }
            None => {
                warn!(attempts = backoff.attempts(), "push channel gave up reconnecting");
                None
            }
        }
    }
}
