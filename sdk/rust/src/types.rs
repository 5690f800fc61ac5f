//! Broker resource types as seen by clients

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A named broadcast channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Topic {
    pub name: String,
}

/// Push delivery settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    pub endpoint: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// A named per-consumer queue attached to one topic
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subscription {
    pub name: String,
    pub topic: String,
    pub push_config: PushConfig,
    pub ack_deadline_seconds: i64,
}

/// A message received from a pull, with the token that acks it
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message: Message,
}

/// A single publish event with decoded payload bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub message_id: String,
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub publish_time: DateTime<Utc>,
}

// Wire shapes: the API carries payload bytes as base64 strings

#[derive(Debug, Deserialize)]
pub(crate) struct ReceivedMessageWire {
    pub ack_id: String,
    pub message: MessageWire,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageWire {
    pub message_id: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub publish_time: DateTime<Utc>,
}

impl TryFrom<ReceivedMessageWire> for ReceivedMessage {
    type Error = ClientError;

    fn try_from(wire: ReceivedMessageWire) -> Result<Self, Self::Error> {
        let data = BASE64
            .decode(&wire.message.data)
            .map_err(|_| ClientError::Decode(format!(
                "message {} carries invalid base64 data",
                wire.message.message_id
            )))?;
        Ok(Self {
            ack_id: wire.ack_id,
            message: Message {
                message_id: wire.message.message_id,
                data,
                attributes: wire.message.attributes,
                publish_time: wire.message.publish_time,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_received_message_decodes_payload() {
        let wire: ReceivedMessageWire = serde_json::from_value(serde_json::json!({
            "ack_id": "ack-1",
            "message": {
                "message_id": "msg-1",
                "data": "aGVsbG8=",
                "attributes": {"k": "v"},
                "publish_time": "2026-08-01T00:00:00Z"
            }
        }))
        .unwrap();

        let received = ReceivedMessage::try_from(wire).unwrap();
        assert_eq!(received.message.data, b"hello".to_vec());
        assert_eq!(received.message.attributes["k"], "v");
    }

    #[test]
    fn test_bad_base64_is_a_decode_error() {
        let wire = ReceivedMessageWire {
            ack_id: "ack-1".to_string(),
            message: MessageWire {
                message_id: "msg-1".to_string(),
                data: "@@@".to_string(),
                attributes: HashMap::new(),
                publish_time: Utc::now(),
            },
        };
        assert!(matches!(
            ReceivedMessage::try_from(wire),
            Err(ClientError::Decode(_))
        ));
    }
}
