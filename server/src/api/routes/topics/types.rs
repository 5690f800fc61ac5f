//! Topic API request/response types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::extractors::is_valid_resource_name;
use crate::broker::Topic;

/// Validator function for topic/subscription names
pub fn validate_resource_name(name: &str) -> Result<(), ValidationError> {
    if !is_valid_resource_name(name) {
        return Err(ValidationError::new("resource_name").with_message(
            "Name must be 1-255 alphanumeric chars, dashes, underscores, or dots".into(),
        ));
    }
    Ok(())
}

/// Topic resource
#[derive(Debug, Serialize, ToSchema)]
pub struct TopicDto {
    pub name: String,
}

impl From<Topic> for TopicDto {
    fn from(topic: Topic) -> Self {
        Self { name: topic.name }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTopicRequest {
    #[validate(custom(function = "validate_resource_name"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PublishRequest {
    /// Payload bytes, base64-encoded
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishResponse {
    pub message_id: String,
}
