//! Path and validation extractors for API routes

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::core::constants::MAX_RESOURCE_NAME_LENGTH;

/// Validate a topic/subscription name: 1-255 chars, alphanumeric plus
/// dash, underscore, and dot
pub fn is_valid_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_RESOURCE_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Raw path extractor for topic routes (internal use)
#[derive(Debug, Deserialize)]
struct TopicPathRaw {
    topic: String,
}

/// Validated topic path extractor.
///
/// Extracts and validates `topic` from URL path parameters.
/// Returns a 400 Bad Request if validation fails.
#[derive(Debug)]
pub struct TopicPath {
    pub topic: String,
}

impl<S> FromRequestParts<S> for TopicPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<TopicPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_resource_name(&raw.topic) {
            return Err(ValidationRejection::InvalidResourceName);
        }

        Ok(Self { topic: raw.topic })
    }
}

/// Raw path extractor for subscription routes (internal use)
#[derive(Debug, Deserialize)]
struct SubscriptionPathRaw {
    subscription: String,
}

/// Validated subscription path extractor.
#[derive(Debug)]
pub struct SubscriptionPath {
    pub subscription: String,
}

impl<S> FromRequestParts<S> for SubscriptionPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<SubscriptionPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_resource_name(&raw.subscription) {
            return Err(ValidationRejection::InvalidResourceName);
        }

        Ok(Self {
            subscription: raw.subscription,
        })
    }
}

/// Validation rejection with structured error response
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Invalid topic/subscription name format
    InvalidResourceName,
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl ValidationRejection {
    /// Flatten `validator` field errors into one readable line
    fn describe(errors: &validator::ValidationErrors) -> String {
        let mut parts = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            for err in field_errors {
                match &err.message {
                    Some(message) => parts.push(message.to_string()),
                    None => parts.push(format!("{field}: invalid value")),
                }
            }
        }
        parts.join("; ")
    }
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::Path(rejection) => ("PATH_PARSE_ERROR", rejection.body_text()),
            Self::InvalidResourceName => (
                "INVALID_RESOURCE_NAME",
                format!(
                    "Invalid name: must be 1-{} alphanumeric chars, dashes, underscores, or dots",
                    MAX_RESOURCE_NAME_LENGTH
                ),
            ),
            Self::Json(rejection) => ("JSON_PARSE_ERROR", rejection.body_text()),
            Self::Validation(errors) => ("VALIDATION_ERROR", Self::describe(&errors)),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "bad_request",
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// JSON body extractor that runs the body's `validator` rules after
/// deserializing; either failure becomes a 400 with a structured code.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        match body.validate() {
            Ok(()) => Ok(Self(body)),
            Err(errors) => Err(ValidationRejection::Validation(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_resource_names() {
        assert!(is_valid_resource_name("orders"));
        assert!(is_valid_resource_name("orders-v2"));
        assert!(is_valid_resource_name("orders_v2.dead-letter"));
    }

    #[test]
    fn test_invalid_resource_names() {
        assert!(!is_valid_resource_name(""));
        assert!(!is_valid_resource_name("orders/evil"));
        assert!(!is_valid_resource_name("orders evil"));
        assert!(!is_valid_resource_name(&"x".repeat(MAX_RESOURCE_NAME_LENGTH + 1)));
    }

    #[test]
    fn test_describe_prefers_explicit_messages() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "name",
            validator::ValidationError::new("resource_name").with_message("bad name".into()),
        );
        assert_eq!(ValidationRejection::describe(&errors), "bad name");

        let mut errors = validator::ValidationErrors::new();
        errors.add("max_messages", validator::ValidationError::new("range"));
        assert_eq!(
            ValidationRejection::describe(&errors),
            "max_messages: invalid value"
        );
    }
}
