//! Self-describing datastore records
//!
//! Every value persisted to the datastore is one of these three records,
//! MessagePack-encoded with field names and an internal `kind` tag. The
//! tag makes `dump` output reconstructable per key prefix, and turns a
//! value of the wrong shape under a key into a typed decode failure
//! instead of a silent misread.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::subscription::Subscription;
use super::topic::Topic;
use crate::data::datastore::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Topic(Topic),
    Subscription(Subscription),
    Message(Message),
}

impl Record {
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        rmp_serde::to_vec_named(self).map_err(|e| StoreError::InvalidEntry(e.to_string()))
    }

    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, StoreError> {
        rmp_serde::from_slice(bytes).map_err(|_| StoreError::InvalidEntry(key.to_string()))
    }

    pub fn into_topic(self, key: &str) -> Result<Topic, StoreError> {
        match self {
            Self::Topic(topic) => Ok(topic),
            _ => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: "topic",
            }),
        }
    }

    pub fn into_subscription(self, key: &str) -> Result<Subscription, StoreError> {
        match self {
            Self::Subscription(subscription) => Ok(subscription),
            _ => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: "subscription",
            }),
        }
    }

    pub fn into_message(self, key: &str) -> Result<Message, StoreError> {
        match self {
            Self::Message(message) => Ok(message),
            _ => Err(StoreError::WrongKind {
                key: key.to_string(),
                expected: "message",
            }),
        }
    }
}
