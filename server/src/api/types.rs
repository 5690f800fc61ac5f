//! Shared API types
//!
//! Error handling for all API endpoints, including the mapping from
//! broker error kinds to HTTP statuses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::broker::BrokerError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Recover the broker error kind and map it to an HTTP status.
    ///
    /// Datastore failures are the only fatal kind; everything else is a
    /// caller-recoverable condition.
    pub fn from_broker(e: BrokerError) -> Self {
        match &e {
            BrokerError::AlreadyExistTopic(_) => Self::conflict("TOPIC_EXISTS", e.to_string()),
            BrokerError::AlreadyExistSubscription(_) => {
                Self::conflict("SUBSCRIPTION_EXISTS", e.to_string())
            }
            BrokerError::NotFoundTopic(_) => Self::not_found("TOPIC_NOT_FOUND", e.to_string()),
            BrokerError::NotFoundSubscription(_) => {
                Self::not_found("SUBSCRIPTION_NOT_FOUND", e.to_string())
            }
            BrokerError::NotFoundMessage(_) => Self::not_found("MESSAGE_NOT_FOUND", e.to_string()),
            BrokerError::NotFoundAckId(_) => Self::not_found("ACK_ID_NOT_FOUND", e.to_string()),
            BrokerError::EmptyMessage => Self::not_found("EMPTY_MESSAGE", e.to_string()),
            BrokerError::InvalidEndpoint(_) => Self::bad_request("INVALID_ENDPOINT", e.to_string()),
            BrokerError::NotYetReceivedAck(_) => {
                Self::conflict("NOT_YET_DELIVERED", e.to_string())
            }
            BrokerError::AlreadyReadMessage(_) => Self::conflict("ALREADY_ACKED", e.to_string()),
            BrokerError::Store(store_err) => {
                tracing::error!(error = %store_err, "Datastore error");
                Self::internal("Datastore operation failed")
            }
        }
    }
}

impl From<BrokerError> for ApiError {
    fn from(e: BrokerError) -> Self {
        Self::from_broker(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Conflict { code, message } => (StatusCode::CONFLICT, "conflict", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_collision_maps_to_conflict() {
        let err = ApiError::from_broker(BrokerError::AlreadyExistTopic("t".into()));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_lookup_miss_maps_to_not_found() {
        for e in [
            BrokerError::NotFoundTopic("t".into()),
            BrokerError::NotFoundSubscription("s".into()),
            BrokerError::NotFoundAckId("a".into()),
            BrokerError::EmptyMessage,
        ] {
            assert_eq!(status_of(ApiError::from_broker(e)), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_bad_endpoint_maps_to_bad_request() {
        let err = ApiError::from_broker(BrokerError::InvalidEndpoint("::x::".into()));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_state_machine_violations_map_to_conflict() {
        for e in [
            BrokerError::NotYetReceivedAck("a".into()),
            BrokerError::AlreadyReadMessage("a".into()),
        ] {
            assert_eq!(status_of(ApiError::from_broker(e)), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_datastore_failure_is_internal() {
        let err = ApiError::from_broker(BrokerError::Store(
            crate::data::StoreError::Connection("down".into()),
        ));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
