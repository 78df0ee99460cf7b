//! WebSocket frame codec: inbound requests and outbound deliveries.
//!
//! Decoding never fails. Anything that is not a JSON object becomes an empty
//! [`InboundFrame`], and a field holding the wrong type reads as absent, so a
//! misbehaving client can only cause its own request to be ignored.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{ChannelName, Sequence};

/// Payload of a keepalive request.
pub const PING: &str = "PING";

/// Payload of a keepalive reply.
pub const PONG: &str = "PONG";

/// A client → server frame.
///
/// Wire shapes:
/// - keepalive: `{"ping": "PING"}`
/// - single-channel resume: `{"message_sequence": 5}`
/// - multiplexed subscribe:
///   `{"multiplex_subscribe": [{"channel": "a", "message_sequence": 1}]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundFrame {
    /// Keepalive marker.
    #[serde(default, deserialize_with = "lenient")]
    pub ping: Option<String>,
    /// Resume cursor for single-channel mode.
    #[serde(default, deserialize_with = "lenient")]
    pub message_sequence: Option<Sequence>,
    /// Ordered subscribe requests for multiplexed mode.
    #[serde(default, deserialize_with = "lenient_entries")]
    pub multiplex_subscribe: Option<Vec<SubscribeEntry>>,
}

/// One `{channel, message_sequence}` pair of a multiplex-subscribe request.
///
/// Both fields are optional on the wire; incomplete entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscribeEntry {
    /// Channel to subscribe to.
    #[serde(default, deserialize_with = "lenient")]
    pub channel: Option<ChannelName>,
    /// Cursor to resume the channel from.
    #[serde(default, deserialize_with = "lenient")]
    pub message_sequence: Option<Sequence>,
}

impl SubscribeEntry {
    /// Returns `(channel, cursor)` when both fields are present.
    #[must_use]
    pub fn complete(&self) -> Option<(&ChannelName, Sequence)> {
        Some((self.channel.as_ref()?, self.message_sequence?))
    }
}

impl InboundFrame {
    /// Decodes a text payload, degrading to an empty frame on any error.
    #[must_use]
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) if value.is_object() => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Returns `true` if this frame is a keepalive request, i.e. `ping`
    /// holds exactly [`PING`].
    #[must_use]
    pub fn is_ping(&self) -> bool {
        self.ping.as_deref() == Some(PING)
    }
}

/// Reads a field as `T`, treating type mismatches and `null` as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Reads a subscribe list, dropping non-object entries so that one bad
/// element does not discard its siblings.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Option<Vec<SubscribeEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|entries| {
        entries
            .iter()
            .filter(|entry| entry.is_object())
            .map(|entry| serde_json::from_value(entry.clone()).unwrap_or_default())
            .collect()
    }))
}

/// A server → client frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Keepalive reply: `{"pong": "PONG"}`.
    Pong {
        /// Always [`PONG`].
        pong: &'static str,
    },
    /// Multiplexed delivery:
    /// `{"channel": …, "message": …, "last_sequence": …}`.
    ChannelMessage {
        /// Channel the message was published on.
        channel: ChannelName,
        /// Message payload.
        message: serde_json::Value,
        /// Cursor the client supplied for this wait.
        last_sequence: Sequence,
    },
    /// Single-channel delivery: `{"message": …, "last_sequence": …}`.
    Message {
        /// Message payload.
        message: serde_json::Value,
        /// Cursor the client supplied for this wait.
        last_sequence: Sequence,
    },
}

impl OutboundFrame {
    /// Builds the keepalive reply.
    #[must_use]
    pub const fn pong() -> Self {
        Self::Pong { pong: PONG }
    }

    /// Encodes the frame as a JSON text payload.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn encoded(frame: &OutboundFrame) -> serde_json::Value {
        serde_json::from_str(&frame.encode()).unwrap_or_default()
    }

    #[test]
    fn decodes_ping() {
        let frame = InboundFrame::decode(r#"{"ping":"PING"}"#);
        assert!(frame.is_ping());
        assert_eq!(frame.message_sequence, None);
    }

    #[test]
    fn other_ping_payloads_are_not_keepalives() {
        for text in [r#"{"ping":""}"#, r#"{"ping":"x"}"#, r#"{"ping":"ping"}"#] {
            assert!(!InboundFrame::decode(text).is_ping(), "{text}");
        }
    }

    #[test]
    fn decodes_resume_cursor() {
        let frame = InboundFrame::decode(r#"{"message_sequence":5}"#);
        assert!(!frame.is_ping());
        assert_eq!(frame.message_sequence, Some(5));
    }

    #[test]
    fn malformed_payloads_decode_empty() {
        for text in ["", "not json", "[1,2]", "42", "\"PING\"", "{\"ping\":", "null"] {
            assert_eq!(InboundFrame::decode(text), InboundFrame::default(), "{text}");
        }
    }

    #[test]
    fn wrong_field_types_read_as_absent() {
        let frame = InboundFrame::decode(r#"{"message_sequence":"5","ping":1}"#);
        assert_eq!(frame, InboundFrame::default());

        let frame = InboundFrame::decode(r#"{"message_sequence":-1}"#);
        assert_eq!(frame.message_sequence, None);

        let frame = InboundFrame::decode(r#"{"multiplex_subscribe":"a"}"#);
        assert_eq!(frame.multiplex_subscribe, None);
    }

    #[test]
    fn decodes_subscribe_list_in_order() {
        let frame = InboundFrame::decode(
            r#"{"multiplex_subscribe":[
                {"channel":"a","message_sequence":1},
                {"channel":"b"},
                7,
                {"channel":"c","message_sequence":3}
            ]}"#,
        );
        let Some(entries) = frame.multiplex_subscribe else {
            panic!("expected subscribe list");
        };
        let complete: Vec<_> = entries
            .iter()
            .filter_map(SubscribeEntry::complete)
            .map(|(channel, seq)| (channel.as_str().to_string(), seq))
            .collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(complete, vec![("a".to_string(), 1), ("c".to_string(), 3)]);
    }

    #[test]
    fn encodes_pong() {
        assert_eq!(
            encoded(&OutboundFrame::pong()),
            serde_json::json!({"pong": "PONG"})
        );
    }

    #[test]
    fn encodes_single_delivery() {
        let frame = OutboundFrame::Message {
            message: serde_json::json!("hello"),
            last_sequence: 5,
        };
        assert_eq!(frame.encode(), r#"{"message":"hello","last_sequence":5}"#);
    }

    #[test]
    fn encodes_multiplexed_delivery() {
        let frame = OutboundFrame::ChannelMessage {
            channel: ChannelName::new("a"),
            message: serde_json::json!({"n": 1}),
            last_sequence: 1,
        };
        assert_eq!(
            encoded(&frame),
            serde_json::json!({"channel": "a", "message": {"n": 1}, "last_sequence": 1})
        );
    }
}
