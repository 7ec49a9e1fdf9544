//! Push channel wire codec.
//!
//! The order-update service speaks Socket.IO (protocol 5) on top of
//! Engine.IO (protocol 4). Over a WebSocket every text frame carries exactly
//! one Engine.IO packet; Engine.IO `message` packets carry one Socket.IO
//! packet.
//!
//! ```text
//! 0{"sid":"abc","pingInterval":25000,...}   engine open
//! 2                                         engine ping
//! 40                                        socket connect, default namespace
//! 42["order_update",{"order_id":7,...}]     socket event
//! 42/admin,13["ev",{}]                      event with namespace and ack id
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Errors decoding or encoding push channel frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame was empty.
    #[error("Empty frame")]
    EmptyFrame,

    /// Unknown Engine.IO packet type.
    #[error("Unknown engine packet type: {0:?}")]
    UnknownEnginePacket(char),

    /// Unknown Socket.IO packet type.
    #[error("Unknown socket packet type: {0:?}")]
    UnknownSocketPacket(char),

    /// Open packet did not carry a valid handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Packet payload is not valid JSON or has the wrong shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Packet uses a feature this client does not implement.
    #[error("Unsupported packet: {0}")]
    Unsupported(&'static str),
}

/// Engine.IO open handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine session id.
    pub sid: String,
    /// Transports the server offers to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// An Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode one WebSocket text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(ProtocolError::EmptyFrame)?;
        let rest = chars.as_str();

        match kind {
            '0' => serde_json::from_str(rest)
                .map(Self::Open)
                .map_err(|e| ProtocolError::InvalidHandshake(e.to_string())),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(rest.to_string())),
            '3' => Ok(Self::Pong(rest.to_string())),
            '4' => Ok(Self::Message(rest.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            // Binary frames arrive as `b<base64>` on text-only transports
            'b' => Err(ProtocolError::Unsupported("binary engine packet")),
            other => Err(ProtocolError::UnknownEnginePacket(other)),
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{}", data),
            Self::Pong(data) => format!("3{}", data),
            Self::Message(data) => format!("4{}", data),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

/// Socket.IO packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketKind {
    fn from_char(c: char) -> Result<Self, ProtocolError> {
        match c {
            '0' => Ok(Self::Connect),
            '1' => Ok(Self::Disconnect),
            '2' => Ok(Self::Event),
            '3' => Ok(Self::Ack),
            '4' => Ok(Self::ConnectError),
            '5' => Ok(Self::BinaryEvent),
            '6' => Ok(Self::BinaryAck),
            other => Err(ProtocolError::UnknownSocketPacket(other)),
        }
    }

    fn as_char(&self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }
}

/// A Socket.IO packet, as carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    /// Packet type.
    pub kind: SocketPacketKind,
    /// Namespace, `/` unless stated.
    pub namespace: String,
    /// Acknowledgement id requested by the sender.
    pub ack_id: Option<u64>,
    /// JSON payload.
    pub data: Option<serde_json::Value>,
}

impl SocketPacket {
    /// Connect to the default namespace.
    pub fn connect() -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// An event on the default namespace.
    pub fn event(name: &str, payload: serde_json::Value) -> Self {
        Self {
            kind: SocketPacketKind::Event,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            data: Some(serde_json::json!([name, payload])),
        }
    }

    /// Decode the body of an Engine.IO message.
    pub fn decode(message: &str) -> Result<Self, ProtocolError> {
        let mut chars = message.chars();
        let kind = SocketPacketKind::from_char(chars.next().ok_or(ProtocolError::EmptyFrame)?)?;
        if matches!(kind, SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck) {
            return Err(ProtocolError::Unsupported("binary attachments"));
        }

        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(end) => {
                    let ns = &rest[..end];
                    rest = &rest[end + 1..];
                    ns.to_string()
                }
                None => {
                    let ns = rest;
                    rest = "";
                    ns.to_string()
                }
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|_| ProtocolError::InvalidPayload("ack id out of range".to_string()))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?,
            )
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    /// Encode as the body of an Engine.IO message.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.as_char());
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Encode as a complete WebSocket text frame.
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }

    /// For event packets, the event name and its arguments.
    pub fn event_parts(&self) -> Result<(&str, &[serde_json::Value]), ProtocolError> {
        let items = self
            .data
            .as_ref()
            .and_then(|d| d.as_array())
            .ok_or_else(|| ProtocolError::InvalidPayload("event is not an array".to_string()))?;

        let (name, args) = items
            .split_first()
            .ok_or_else(|| ProtocolError::InvalidPayload("event has no name".to_string()))?;
        let name = name
            .as_str()
            .ok_or_else(|| ProtocolError::InvalidPayload("event name is not a string".to_string()))?;

        Ok((name, args))
    }
}
