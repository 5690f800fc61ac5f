//! Push deliverer
//!
//! For each subscription with a push endpoint, a periodic task pulls up
//! to a small batch and POSTs each message as JSON to the endpoint, with
//! the subscription's ack deadline as the HTTP timeout. A 2xx response is
//! an implicit ack; anything else leaves the entry `delivered`, and
//! deadline expiry makes it eligible again — that is the retry mechanism.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::BrokerError;
use super::subscription::{PulledMessage, PushConfig};
use super::Broker;

/// JSON body POSTed to push endpoints
#[derive(Serialize)]
struct PushEnvelope<'a> {
    subscription: &'a str,
    message: PushedMessage<'a>,
    /// Push-config attributes, passed through verbatim
    attributes: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct PushedMessage<'a> {
    message_id: &'a str,
    /// Payload bytes, base64
    data: String,
    attributes: &'a HashMap<String, String>,
    publish_time: DateTime<Utc>,
}

pub struct PushDeliverer {
    broker: Arc<Broker>,
    client: reqwest::Client,
    batch_size: usize,
}

impl PushDeliverer {
    pub fn new(broker: Arc<Broker>, batch_size: usize) -> Self {
        Self {
            broker,
            client: reqwest::Client::new(),
            batch_size,
        }
    }

    /// Spawn the delivery loop; stops when the shutdown signal flips
    pub fn start(
        self,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => match self.run_once().await {
                        Ok(0) => {}
                        Ok(n) => tracing::debug!(delivered = n, "Push deliveries completed"),
                        Err(e) => tracing::warn!(error = %e, "Push delivery tick failed"),
                    },
                }
            }
            tracing::debug!("Push deliverer stopped");
        })
    }

    /// One delivery tick over every push-configured subscription.
    /// Returns how many messages were delivered and implicitly acked.
    pub async fn run_once(&self) -> Result<u64, BrokerError> {
        let mut delivered = 0;
        for sub in self.broker.list_subscriptions().await? {
            let Some(push) = sub.push.clone() else {
                continue;
            };
            let pulled = match self.broker.pull(&sub.name, self.batch_size).await {
                Ok(pulled) => pulled,
                Err(BrokerError::EmptyMessage) => continue,
                Err(e) => {
                    tracing::warn!(subscription = %sub.name, error = %e, "Pull for push delivery failed");
                    continue;
                }
            };

            let timeout = Duration::from_secs(sub.ack_deadline_secs);
            for pulled_message in pulled {
                match self.post(&push, &sub.name, &pulled_message, timeout).await {
                    Ok(()) => {
                        let ack_ids = std::slice::from_ref(&pulled_message.ack_id);
                        match self.broker.ack(&sub.name, ack_ids).await {
                            Ok(()) => delivered += 1,
                            Err(e) => {
                                tracing::warn!(subscription = %sub.name, error = %e, "Implicit ack after push failed")
                            }
                        }
                    }
                    Err(e) => {
                        // Left delivered; deadline expiry retries it
                        tracing::debug!(
                            subscription = %sub.name,
                            endpoint = %push.endpoint,
                            error = %e,
                            "Push delivery failed"
                        );
                    }
                }
            }
        }
        Ok(delivered)
    }

    async fn post(
        &self,
        push: &PushConfig,
        subscription: &str,
        pulled: &PulledMessage,
        timeout: Duration,
    ) -> Result<(), reqwest::Error> {
        let envelope = PushEnvelope {
            subscription,
            message: PushedMessage {
                message_id: &pulled.message.id,
                data: BASE64.encode(&pulled.message.data),
                attributes: &pulled.message.attributes,
                publish_time: pulled.message.published_at,
            },
            attributes: &push.attributes,
        };
        self.client
            .post(&push.endpoint)
            .timeout(timeout)
            .json(&envelope)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use httpmock::prelude::*;

    use super::*;

    async fn push_broker(endpoint: &str) -> Arc<Broker> {
        let broker = Arc::new(Broker::in_memory());
        broker.create_topic("t").await.unwrap();
        broker
            .create_subscription("s", "t", 10, endpoint, HashMap::new())
            .await
            .unwrap();
        broker
    }

    #[tokio::test]
    async fn test_push_delivers_and_implicitly_acks() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hook")
                    .body_includes("aGVsbG8="); // base64("hello")
                then.status(200);
            })
            .await;

        let broker = push_broker(&server.url("/hook")).await;
        broker
            .publish("t", b"hello".to_vec(), HashMap::new())
            .await
            .unwrap();

        let deliverer = PushDeliverer::new(Arc::clone(&broker), 16);
        let delivered = deliverer.run_once().await.unwrap();
        assert_eq!(delivered, 1);
        mock.assert_async().await;

        // The 2xx was an implicit ack
        let err = broker.pull("s", 1).await.unwrap_err();
        assert!(matches!(err, BrokerError::EmptyMessage));
    }

    #[tokio::test]
    async fn test_failed_push_retries_after_deadline() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(500);
            })
            .await;

        let broker = push_broker(&server.url("/hook")).await;
        broker
            .publish("t", b"hello".to_vec(), HashMap::new())
            .await
            .unwrap();

        let deliverer = PushDeliverer::new(Arc::clone(&broker), 16);
        let delivered = deliverer.run_once().await.unwrap();
        assert_eq!(delivered, 0);
        mock.assert_async().await;

        // Still claimed within the deadline window
        let err = broker.pull("s", 1).await.unwrap_err();
        assert!(matches!(err, BrokerError::EmptyMessage));

        // Eligible again once the deadline lapses
        let later = Utc::now() + ChronoDuration::seconds(11);
        let pulled = broker.pull_at("s", 1, later).await.unwrap();
        assert_eq!(pulled[0].message.data, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_pull_only_subscriptions_are_skipped() {
        let broker = push_broker("").await;
        broker
            .publish("t", b"hello".to_vec(), HashMap::new())
            .await
            .unwrap();

        let deliverer = PushDeliverer::new(Arc::clone(&broker), 16);
        let delivered = deliverer.run_once().await.unwrap();
        assert_eq!(delivered, 0);

        // The message is still there for pullers
        let pulled = broker.pull("s", 1).await.unwrap();
        assert_eq!(pulled.len(), 1);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let broker = Arc::new(Broker::in_memory());
        let (tx, rx) = watch::channel(false);

        let handle =
            PushDeliverer::new(broker, 16).start(std::time::Duration::from_millis(10), rx);
        tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
