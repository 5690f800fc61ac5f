//! Async client for the Courier pub/sub broker HTTP API
//!
//! ```no_run
//! # async fn example() -> Result<(), courier::ClientError> {
//! let client = courier::Client::new("http://127.0.0.1:8085");
//! client.create_topic("orders").await?;
//! client
//!     .create_subscription("orders-worker", "orders", 30, None)
//!     .await?;
//! client.publish("orders", b"hello".to_vec(), Default::default()).await?;
//!
//! for received in client.pull("orders-worker", 10).await? {
//!     println!("{:?}", received.message.data);
//!     client.ack("orders-worker", &[received.ack_id]).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod types;

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub use error::ClientError;
pub use types::{Message, PushConfig, ReceivedMessage, Subscription, Topic};

use types::ReceivedMessageWire;

/// Error body returned by the broker
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponseWire {
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct PullResponseWire {
    received_messages: Vec<ReceivedMessageWire>,
}

/// Courier broker client
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Use a pre-configured `reqwest::Client` (timeouts, proxies, ...)
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Decode a success body, or surface the broker's error kind
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::api_error(status, response).await)
    }

    async fn expect_ok(response: reqwest::Response) -> Result<(), ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::api_error(status, response).await)
    }

    async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
        let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
            code: "UNKNOWN".to_string(),
            message: String::new(),
        });
        ClientError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        }
    }

    // =========================================================================
    // Topics
    // =========================================================================

    pub async fn create_topic(&self, name: &str) -> Result<Topic, ClientError> {
        let response = self
            .http
            .post(self.url("/topics"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_topic(&self, name: &str) -> Result<Topic, ClientError> {
        let response = self.http.get(self.url(&format!("/topics/{name}"))).send().await?;
        Self::decode(response).await
    }

    pub async fn list_topics(&self) -> Result<Vec<Topic>, ClientError> {
        let response = self.http.get(self.url("/topics")).send().await?;
        Self::decode(response).await
    }

    pub async fn delete_topic(&self, name: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/topics/{name}")))
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    /// Publish a message; returns the broker-assigned message id
    pub async fn publish(
        &self,
        topic: &str,
        data: Vec<u8>,
        attributes: HashMap<String, String>,
    ) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/topics/{topic}/publish")))
            .json(&serde_json::json!({
                "data": BASE64.encode(&data),
                "attributes": attributes,
            }))
            .send()
            .await?;
        let body: PublishResponseWire = Self::decode(response).await?;
        Ok(body.message_id)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub async fn create_subscription(
        &self,
        name: &str,
        topic: &str,
        ack_deadline_seconds: i64,
        push_config: Option<PushConfig>,
    ) -> Result<Subscription, ClientError> {
        let response = self
            .http
            .post(self.url("/subscriptions"))
            .json(&serde_json::json!({
                "name": name,
                "topic": topic,
                "ack_deadline_seconds": ack_deadline_seconds,
                "push_config": push_config,
            }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_subscription(&self, name: &str) -> Result<Subscription, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/subscriptions/{name}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ClientError> {
        let response = self.http.get(self.url("/subscriptions")).send().await?;
        Self::decode(response).await
    }

    pub async fn delete_subscription(&self, name: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/subscriptions/{name}")))
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    /// Pull up to `max_messages` deliverable messages.
    ///
    /// A broker answering "nothing deliverable" is not an error here; it
    /// comes back as an empty vec.
    pub async fn pull(
        &self,
        subscription: &str,
        max_messages: usize,
    ) -> Result<Vec<ReceivedMessage>, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/subscriptions/{subscription}/pull")))
            .json(&serde_json::json!({ "max_messages": max_messages }))
            .send()
            .await?;

        let body: PullResponseWire = match Self::decode(response).await {
            Ok(body) => body,
            Err(e) if e.is_code("EMPTY_MESSAGE") => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        body.received_messages
            .into_iter()
            .map(ReceivedMessage::try_from)
            .collect()
    }

    pub async fn ack(&self, subscription: &str, ack_ids: &[String]) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/subscriptions/{subscription}/ack")))
            .json(&serde_json::json!({ "ack_ids": ack_ids }))
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    pub async fn modify_ack_deadline(
        &self,
        subscription: &str,
        ack_ids: &[String],
        ack_deadline_seconds: i64,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/subscriptions/{subscription}/modify-ack")))
            .json(&serde_json::json!({
                "ack_ids": ack_ids,
                "ack_deadline_seconds": ack_deadline_seconds,
            }))
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    /// Replace the push configuration; `None` makes the subscription
    /// pull-only
    pub async fn modify_push_config(
        &self,
        subscription: &str,
        push_config: Option<PushConfig>,
    ) -> Result<Subscription, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/subscriptions/{subscription}/push-config")))
            .json(&serde_json::json!({ "push_config": push_config }))
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    #[tokio::test]
    async fn test_create_topic() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/topics")
                    .json_body(serde_json::json!({"name": "orders"}));
                then.status(201)
                    .json_body(serde_json::json!({"name": "orders"}));
            })
            .await;

        let client = Client::new(server.base_url());
        let topic = client.create_topic("orders").await.unwrap();
        assert_eq!(topic.name, "orders");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_conflict_surfaces_broker_code() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/topics");
                then.status(409).json_body(serde_json::json!({
                    "error": "conflict",
                    "code": "TOPIC_EXISTS",
                    "message": "already exist topic: orders"
                }));
            })
            .await;

        let client = Client::new(server.base_url());
        let err = client.create_topic("orders").await.unwrap_err();
        assert!(err.is_code("TOPIC_EXISTS"));
    }

    #[tokio::test]
    async fn test_publish_encodes_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/topics/orders/publish")
                    .json_body_includes(r#"{"data": "aGVsbG8="}"#);
                then.status(200)
                    .json_body(serde_json::json!({"message_id": "msg-1"}));
            })
            .await;

        let client = Client::new(server.base_url());
        let message_id = client
            .publish("orders", b"hello".to_vec(), HashMap::new())
            .await
            .unwrap();
        assert_eq!(message_id, "msg-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_pull_decodes_messages() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/subscriptions/worker/pull");
                then.status(200).json_body(serde_json::json!({
                    "received_messages": [{
                        "ack_id": "ack-1",
                        "message": {
                            "message_id": "msg-1",
                            "data": "aGVsbG8=",
                            "attributes": {},
                            "publish_time": "2026-08-01T00:00:00Z"
                        }
                    }]
                }));
            })
            .await;

        let client = Client::new(server.base_url());
        let received = client.pull("worker", 10).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].ack_id, "ack-1");
        assert_eq!(received[0].message.data, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_pull_empty_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/subscriptions/worker/pull");
                then.status(404).json_body(serde_json::json!({
                    "error": "not_found",
                    "code": "EMPTY_MESSAGE",
                    "message": "no deliverable message"
                }));
            })
            .await;

        let client = Client::new(server.base_url());
        let received = client.pull("worker", 10).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_ack() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/subscriptions/worker/ack")
                    .json_body(serde_json::json!({"ack_ids": ["ack-1"]}));
                then.status(200);
            })
            .await;

        let client = Client::new(server.base_url());
        client.ack("worker", &["ack-1".to_string()]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_tolerated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/topics");
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let client = Client::new(format!("{}/", server.base_url()));
        let topics = client.list_topics().await.unwrap();
        assert!(topics.is_empty());
    }
}
