//! Datastore error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Datastore configuration error: {0}")]
    Config(String),

    #[error("Datastore connection error: {0}")]
    Connection(String),

    #[error("no entry for key: {0}")]
    NotFound(String),

    #[error("malformed entry: {0}")]
    InvalidEntry(String),

    #[error("entry for key {key} is not a {expected}")]
    WrongKind { key: String, expected: &'static str },

    #[error("Redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
}

impl StoreError {
    /// Whether this error is a plain lookup miss (as opposed to a
    /// connection or corruption failure).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
