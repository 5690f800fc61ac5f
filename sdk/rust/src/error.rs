//! Client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The broker rejected the request; `code` is the broker's error kind
    /// (e.g. `TOPIC_EXISTS`, `EMPTY_MESSAGE`, `ACK_ID_NOT_FOUND`)
    #[error("{status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether this is a broker-side error with the given code
    pub fn is_code(&self, expected: &str) -> bool {
        matches!(self, Self::Api { code, .. } if code == expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            status: 409,
            code: "TOPIC_EXISTS".to_string(),
            message: "already exist topic: t".to_string(),
        };
        assert_eq!(err.to_string(), "409 TOPIC_EXISTS: already exist topic: t");
        assert!(err.is_code("TOPIC_EXISTS"));
        assert!(!err.is_code("EMPTY_MESSAGE"));
    }
}
