//! Subscription API request/response types

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::routes::topics::types::validate_resource_name;
use crate::broker::{Message, PulledMessage, PushConfig, Subscription};

/// Push configuration resource. An empty endpoint means the subscription
/// is pull-only.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct PushConfigDto {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl From<Option<PushConfig>> for PushConfigDto {
    fn from(push: Option<PushConfig>) -> Self {
        match push {
            Some(push) => Self {
                endpoint: push.endpoint,
                attributes: push.attributes,
            },
            None => Self::default(),
        }
    }
}

/// Subscription resource
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionDto {
    pub name: String,
    pub topic: String,
    pub push_config: PushConfigDto,
    pub ack_deadline_seconds: i64,
}

impl From<Subscription> for SubscriptionDto {
    fn from(sub: Subscription) -> Self {
        Self {
            name: sub.name,
            topic: sub.topic_id,
            ack_deadline_seconds: sub.ack_deadline_secs as i64,
            push_config: PushConfigDto::from(sub.push),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubscriptionRequest {
    #[validate(custom(function = "validate_resource_name"))]
    pub name: String,
    #[validate(custom(function = "validate_resource_name"))]
    pub topic: String,
    /// Defaults to 10 seconds when absent or non-positive
    #[serde(default)]
    pub ack_deadline_seconds: i64,
    pub push_config: Option<PushConfigDto>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PullRequest {
    #[validate(range(min = 1, max = 1000))]
    pub max_messages: usize,
}

/// Message resource with payload bytes base64-encoded
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageDto {
    pub message_id: String,
    pub data: String,
    pub attributes: HashMap<String, String>,
    pub publish_time: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            data: BASE64.encode(&message.data),
            attributes: message.attributes,
            publish_time: message.published_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceivedMessageDto {
    pub ack_id: String,
    pub message: MessageDto,
}

impl From<PulledMessage> for ReceivedMessageDto {
    fn from(pulled: PulledMessage) -> Self {
        Self {
            ack_id: pulled.ack_id,
            message: MessageDto::from(pulled.message),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PullResponse {
    pub received_messages: Vec<ReceivedMessageDto>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AckRequest {
    #[validate(length(min = 1, max = 1000))]
    pub ack_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ModifyAckRequest {
    #[validate(length(min = 1, max = 1000))]
    pub ack_ids: Vec<String>,
    pub ack_deadline_seconds: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ModifyPushRequest {
    /// Absent config (or an empty endpoint) makes the subscription
    /// pull-only
    pub push_config: Option<PushConfigDto>,
}
