//! Broker error types

use thiserror::Error;

use crate::data::datastore::StoreError;

/// Typed failure values propagated to the API boundary.
///
/// The boundary recovers the kind and maps it to an HTTP status; datastore
/// failures are fatal to the operation, everything else is
/// caller-recoverable.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("already exist topic: {0}")]
    AlreadyExistTopic(String),

    #[error("already exist subscription: {0}")]
    AlreadyExistSubscription(String),

    #[error("not found topic: {0}")]
    NotFoundTopic(String),

    #[error("not found subscription: {0}")]
    NotFoundSubscription(String),

    #[error("not found message: {0}")]
    NotFoundMessage(String),

    #[error("not found entry for ack id: {0}")]
    NotFoundAckId(String),

    #[error("invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("no deliverable message")]
    EmptyMessage,

    #[error("not yet delivered, cannot ack: {0}")]
    NotYetReceivedAck(String),

    #[error("already acked: {0}")]
    AlreadyReadMessage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = BrokerError::AlreadyExistTopic("orders".to_string());
        assert_eq!(err.to_string(), "already exist topic: orders");

        let err = BrokerError::NotFoundAckId("ack-123".to_string());
        assert_eq!(err.to_string(), "not found entry for ack id: ack-123");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err = BrokerError::from(StoreError::NotFound("message/x".to_string()));
        assert_eq!(err.to_string(), "no entry for key: message/x");
    }
}
