//! Envelope and message-type catalog.
//!
//! An [`Envelope`] is the structured unit of data exchanged over the
//! connection: a `type` discriminator plus arbitrary additional fields.
//! [`MessageType`] enumerates the known tags; unknown tags round-trip
//! losslessly through [`MessageType::Other`] so newer servers can add tags
//! without breaking older clients.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// MessageType
// ============================================================================

/// Message type discriminator.
///
/// Known tags cover connection control (`connect`, `ping`, ...), general
/// push notifications (`alert`, `status_update`, ...), and the per-module
/// families emitted by the server (device, profile, proxy, campaign,
/// crawler). Anything else deserializes as [`MessageType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    // ------------------------------------------------------------------
    // Connection control
    // ------------------------------------------------------------------
    /// Connection established notification.
    Connect,
    /// Connection teardown notification.
    Disconnect,
    /// Authentication exchange.
    Auth,
    /// Client liveness signal.
    Ping,
    /// Server liveness reply.
    Pong,
    /// Server-reported error.
    Error,

    // ------------------------------------------------------------------
    // General push notifications
    // ------------------------------------------------------------------
    /// Generic notification.
    Notification,
    /// High-priority alert.
    Alert,
    /// Entity status change.
    StatusUpdate,

    // ------------------------------------------------------------------
    // Device module
    // ------------------------------------------------------------------
    /// Device screen capture frame.
    DeviceScreen,
    /// Device remote-control event.
    DeviceControl,
    /// Device status change.
    DeviceStatus,
    /// Device notification.
    DeviceNotification,
    /// Device activity event.
    DeviceActivity,

    // ------------------------------------------------------------------
    // Profile module
    // ------------------------------------------------------------------
    /// Profile update.
    ProfileUpdate,
    /// Profile status change.
    ProfileStatus,
    /// Profile activity event.
    ProfileActivity,

    // ------------------------------------------------------------------
    // Proxy module
    // ------------------------------------------------------------------
    /// Proxy status change.
    ProxyStatus,
    /// Proxy metrics sample.
    ProxyMetrics,
    /// Proxy validation result.
    ProxyValidation,
    /// Proxy activity event.
    ProxyActivity,

    // ------------------------------------------------------------------
    // Campaign module
    // ------------------------------------------------------------------
    /// Campaign activity event.
    CampaignActivity,
    /// Campaign progress update.
    CampaignProgress,
    /// Campaign result.
    CampaignResult,

    // ------------------------------------------------------------------
    // Crawler module
    // ------------------------------------------------------------------
    /// Crawler activity event.
    CrawlerActivity,
    /// Crawler progress update.
    CrawlerProgress,
    /// Crawler result.
    CrawlerResult,

    // ------------------------------------------------------------------
    // Fallback
    // ------------------------------------------------------------------
    /// Unrecognized tag, preserved verbatim.
    Other(String),
}

impl MessageType {
    /// Returns the wire name of this tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Auth => "auth",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Error => "error",
            Self::Notification => "notification",
            Self::Alert => "alert",
            Self::StatusUpdate => "status_update",
            Self::DeviceScreen => "device_screen",
            Self::DeviceControl => "device_control",
            Self::DeviceStatus => "device_status",
            Self::DeviceNotification => "device_notification",
            Self::DeviceActivity => "device_activity",
            Self::ProfileUpdate => "profile_update",
            Self::ProfileStatus => "profile_status",
            Self::ProfileActivity => "profile_activity",
            Self::ProxyStatus => "proxy_status",
            Self::ProxyMetrics => "proxy_metrics",
            Self::ProxyValidation => "proxy_validation",
            Self::ProxyActivity => "proxy_activity",
            Self::CampaignActivity => "campaign_activity",
            Self::CampaignProgress => "campaign_progress",
            Self::CampaignResult => "campaign_result",
            Self::CrawlerActivity => "crawler_activity",
            Self::CrawlerProgress => "crawler_progress",
            Self::CrawlerResult => "crawler_result",
            Self::Other(tag) => tag,
        }
    }

    /// Returns `true` if this is a connection-control tag.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::Connect | Self::Disconnect | Self::Auth | Self::Ping | Self::Pong | Self::Error
        )
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "auth" => Self::Auth,
            "ping" => Self::Ping,
            "pong" => Self::Pong,
            "error" => Self::Error,
            "notification" => Self::Notification,
            "alert" => Self::Alert,
            "status_update" => Self::StatusUpdate,
            "device_screen" => Self::DeviceScreen,
            "device_control" => Self::DeviceControl,
            "device_status" => Self::DeviceStatus,
            "device_notification" => Self::DeviceNotification,
            "device_activity" => Self::DeviceActivity,
            "profile_update" => Self::ProfileUpdate,
            "profile_status" => Self::ProfileStatus,
            "profile_activity" => Self::ProfileActivity,
            "proxy_status" => Self::ProxyStatus,
            "proxy_metrics" => Self::ProxyMetrics,
            "proxy_validation" => Self::ProxyValidation,
            "proxy_activity" => Self::ProxyActivity,
            "campaign_activity" => Self::CampaignActivity,
            "campaign_progress" => Self::CampaignProgress,
            "campaign_result" => Self::CampaignResult,
            "crawler_activity" => Self::CrawlerActivity,
            "crawler_progress" => Self::CrawlerProgress,
            "crawler_result" => Self::CrawlerResult,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A typed message exchanged over the connection.
///
/// # Format
///
/// Serialized as a flat JSON object: the `type` field carries the tag and
/// every payload entry sits beside it.
///
/// ```json
/// { "type": "ping", "timestamp": 1754524800000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Additional named fields; opaque to the transport.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Creates an envelope with an empty payload.
    #[inline]
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            payload: Map::new(),
        }
    }

    /// Creates a `ping` envelope stamped with the current time in ms.
    #[must_use]
    pub fn ping() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(MessageType::Ping).with_field("timestamp", timestamp)
    }

    /// Adds a payload field, consuming and returning the envelope.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Returns a payload field, if present.
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Gets a string from the payload.
    ///
    /// Returns empty string if the key is absent or not a string.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Gets a u64 from the payload.
    ///
    /// Returns 0 if the key is absent or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.payload
            .get(key)
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }

    /// Gets a boolean from the payload.
    ///
    /// Returns false if the key is absent or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.payload
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }

    /// Decodes an envelope from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the frame is not a JSON object with a
    /// string `type` field.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::decode(e.to_string()))
    }

    /// Encodes the envelope as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tag_round_trip() {
        for tag in [
            "connect",
            "ping",
            "pong",
            "alert",
            "status_update",
            "device_screen",
            "profile_activity",
            "proxy_validation",
            "campaign_progress",
            "crawler_result",
        ] {
            let kind = MessageType::from(tag);
            assert!(!matches!(kind, MessageType::Other(_)), "tag {tag}");
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let kind = MessageType::from("wallet_balance");
        assert_eq!(kind, MessageType::Other("wallet_balance".to_string()));
        assert_eq!(kind.as_str(), "wallet_balance");
    }

    #[test]
    fn test_is_control() {
        assert!(MessageType::Ping.is_control());
        assert!(MessageType::Auth.is_control());
        assert!(!MessageType::Alert.is_control());
        assert!(!MessageType::from("custom").is_control());
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = Envelope::new(MessageType::Alert)
            .with_field("message", "proxy pool exhausted")
            .with_field("severity", "high");

        let json = envelope.to_json().expect("serialize");
        assert!(json.contains(r#""type":"alert""#));
        assert!(json.contains("proxy pool exhausted"));

        let decoded = Envelope::from_json(&json).expect("decode");
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_envelope_deserialization() {
        let envelope = Envelope::from_json(
            r#"{"type":"device_status","deviceId":"d-17","online":true,"battery":88}"#,
        )
        .expect("decode");

        assert_eq!(envelope.kind, MessageType::DeviceStatus);
        assert_eq!(envelope.get_str("deviceId"), "d-17");
        assert!(envelope.get_bool("online"));
        assert_eq!(envelope.get_u64("battery"), 88);

        // Missing keys return defaults.
        assert_eq!(envelope.get_str("missing"), "");
        assert_eq!(envelope.get_u64("missing"), 0);
        assert!(!envelope.get_bool("missing"));
    }

    #[test]
    fn test_unknown_type_deserializes() {
        let envelope =
            Envelope::from_json(r#"{"type":"wallet_balance","amount":3}"#).expect("decode");
        assert_eq!(
            envelope.kind,
            MessageType::Other("wallet_balance".to_string())
        );
        assert_eq!(envelope.get_u64("amount"), 3);
    }

    #[test]
    fn test_malformed_frame_is_error() {
        assert!(Envelope::from_json("not json").is_err());
        assert!(Envelope::from_json(r#"{"no_type_field":1}"#).is_err());
        assert!(Envelope::from_json(r#"[1,2,3]"#).is_err());

        let err = Envelope::from_json("not json").unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_ping_has_timestamp() {
        let ping = Envelope::ping();
        assert_eq!(ping.kind, MessageType::Ping);
        assert!(ping.get_u64("timestamp") > 0);
    }
}
