//! Subscriptions: per-consumer ordered queues with ack tracking
//!
//! Each subscription owns an ordered sequence of `(message_id, ack_id)`
//! entries in publish-arrival order. Pull, ack, modify-ack, push-config
//! changes and queue appends are all serialized by the subscription's
//! mutex; delivery-state transitions on the shared message records go
//! through the message registry's serialized read-modify-write.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::Broker;
use super::error::BrokerError;
use super::message::Message;
use crate::core::constants::{DEFAULT_ACK_DEADLINE_SECS, MIN_ACK_DEADLINE_SECS};

/// Push delivery settings for one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    pub endpoint: String,
    pub attributes: HashMap<String, String>,
}

impl PushConfig {
    /// Validate an endpoint + attribute pair from a request.
    ///
    /// An empty endpoint clears push config (the subscription becomes
    /// pull-only); anything else must parse as an http(s) URL.
    pub fn parse(
        endpoint: &str,
        attributes: HashMap<String, String>,
    ) -> Result<Option<Self>, BrokerError> {
        if endpoint.is_empty() {
            return Ok(None);
        }
        let url = Url::parse(endpoint)
            .map_err(|_| BrokerError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BrokerError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Some(Self {
            endpoint: url.to_string(),
            attributes,
        }))
    }
}

/// One queue slot: a message reference plus its delivery token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub message_id: String,
    pub ack_id: String,
}

/// A named per-consumer queue attached to one topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub name: String,
    pub topic_id: String,
    pub ack_deadline_secs: u64,
    pub push: Option<PushConfig>,
    /// Entries in publish-arrival order
    pub queue: Vec<QueueEntry>,
}

impl Subscription {
    pub fn new(name: String, topic_id: String, ack_deadline_secs: u64, push: Option<PushConfig>) -> Self {
        Self {
            name,
            topic_id,
            ack_deadline_secs,
            push,
            queue: Vec::new(),
        }
    }

    pub fn ack_deadline(&self) -> Duration {
        Duration::seconds(self.ack_deadline_secs as i64)
    }

    fn position_of_ack(&self, ack_id: &str) -> Option<usize> {
        self.queue.iter().position(|e| e.ack_id == ack_id)
    }
}

/// A message handed to a puller, with the token that acks it
#[derive(Debug, Clone, PartialEq)]
pub struct PulledMessage {
    pub ack_id: String,
    pub message: Message,
}

/// Clamp a requested ack deadline: non-positive takes the default,
/// anything else is held to the minimum.
fn normalize_ack_deadline(seconds: i64) -> u64 {
    if seconds <= 0 {
        DEFAULT_ACK_DEADLINE_SECS
    } else {
        (seconds as u64).max(MIN_ACK_DEADLINE_SECS)
    }
}

impl Broker {
    /// Create a subscription under an existing topic; fails if the name
    /// is taken or the push endpoint does not parse.
    pub async fn create_subscription(
        &self,
        name: &str,
        topic: &str,
        ack_deadline_seconds: i64,
        push_endpoint: &str,
        push_attributes: HashMap<String, String>,
    ) -> Result<Subscription, BrokerError> {
        let topic = self.topics.get(topic).await?;
        let push = PushConfig::parse(push_endpoint, push_attributes)?;
        let subscription = Subscription::new(
            name.to_string(),
            topic.name,
            normalize_ack_deadline(ack_deadline_seconds),
            push,
        );

        let subscription = self.subscriptions.create(subscription).await?;
        self.stats.add_subscriptions(1);
        tracing::debug!(subscription = %subscription.name, topic = %subscription.topic_id, "Subscription created");
        Ok(subscription)
    }

    pub async fn get_subscription(&self, name: &str) -> Result<Subscription, BrokerError> {
        self.subscriptions.get(name).await
    }

    /// All subscriptions, sorted by name
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, BrokerError> {
        self.subscriptions.list().await
    }

    pub async fn delete_subscription(&self, name: &str) -> Result<(), BrokerError> {
        let lock = self.subscriptions.lock(name);
        let _guard = lock.lock().await;

        self.subscriptions.get(name).await?;
        self.subscriptions.delete(name).await?;
        self.stats.add_subscriptions(-1);
        tracing::debug!(subscription = %name, "Subscription deleted");
        Ok(())
    }

    /// Pull up to `max_messages` deliverable messages.
    ///
    /// Scans the queue in arrival order; every claimed entry is moved to
    /// `delivered` with a fresh deadline and persisted before the response
    /// is returned, so a crash mid-pull redelivers (at-least-once).
    pub async fn pull(
        &self,
        subscription: &str,
        max_messages: usize,
    ) -> Result<Vec<PulledMessage>, BrokerError> {
        self.pull_at(subscription, max_messages, Utc::now()).await
    }

    /// Pull with an explicit claim instant
    pub async fn pull_at(
        &self,
        subscription: &str,
        max_messages: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<PulledMessage>, BrokerError> {
        let lock = self.subscriptions.lock(subscription);
        let _guard = lock.lock().await;

        let sub = self.subscriptions.get(subscription).await?;
        let deadline = now + sub.ack_deadline();

        let mut pulled = Vec::new();
        for entry in &sub.queue {
            if pulled.len() >= max_messages {
                break;
            }
            let (claimed, message) = self
                .messages
                .mutate(&entry.message_id, |m| {
                    if m.deliverable(&sub.name, now) {
                        m.mark_delivered(&sub.name, deadline);
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                })
                .await?;
            if claimed {
                pulled.push(PulledMessage {
                    ack_id: entry.ack_id.clone(),
                    message,
                });
            }
        }

        if pulled.is_empty() {
            return Err(BrokerError::EmptyMessage);
        }
        tracing::debug!(subscription = %sub.name, count = pulled.len(), "Messages pulled");
        Ok(pulled)
    }

    /// Ack delivered messages by token.
    ///
    /// The batch stops at the first failure; earlier acks in the batch
    /// remain applied. A message acked by all of its target subscriptions
    /// is released from the message store.
    pub async fn ack(&self, subscription: &str, ack_ids: &[String]) -> Result<(), BrokerError> {
        let lock = self.subscriptions.lock(subscription);
        let _guard = lock.lock().await;

        let mut sub = self.subscriptions.get(subscription).await?;
        for ack_id in ack_ids {
            let pos = sub
                .position_of_ack(ack_id)
                .ok_or_else(|| BrokerError::NotFoundAckId(ack_id.clone()))?;
            let message_id = sub.queue[pos].message_id.clone();

            self.messages
                .mutate(&message_id, |m| m.mark_acked(&sub.name, ack_id))
                .await?;

            // Terminal: drop the queue entry and persist, so the acks
            // applied so far survive a later failure in the batch
            sub.queue.remove(pos);
            self.subscriptions.set(&sub).await?;
            self.stats.add_messages(&sub.name, -1);
        }
        Ok(())
    }

    /// Move the ack deadline of delivered entries; zero seconds returns
    /// them to eligibility immediately.
    pub async fn modify_ack_deadline(
        &self,
        subscription: &str,
        ack_ids: &[String],
        ack_deadline_seconds: i64,
    ) -> Result<(), BrokerError> {
        self.modify_ack_deadline_at(subscription, ack_ids, ack_deadline_seconds, Utc::now())
            .await
    }

    /// Modify with an explicit base instant
    pub async fn modify_ack_deadline_at(
        &self,
        subscription: &str,
        ack_ids: &[String],
        ack_deadline_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        let lock = self.subscriptions.lock(subscription);
        let _guard = lock.lock().await;

        let sub = self.subscriptions.get(subscription).await?;
        let seconds = ack_deadline_seconds.max(0);
        for ack_id in ack_ids {
            let pos = sub
                .position_of_ack(ack_id)
                .ok_or_else(|| BrokerError::NotFoundAckId(ack_id.clone()))?;
            let message_id = sub.queue[pos].message_id.clone();

            self.messages
                .mutate(&message_id, |m| {
                    // Only meaningful while delivered; a waiting entry is
                    // left untouched
                    if seconds == 0 {
                        m.requeue(&sub.name);
                    } else {
                        m.set_deadline(&sub.name, now + Duration::seconds(seconds));
                    }
                    Ok(())
                })
                .await?;
        }
        Ok(())
    }

    /// Replace the push configuration. An empty endpoint clears it; the
    /// push deliverer picks up the change on its next tick, with no
    /// retroactive delivery of waiting messages.
    pub async fn set_push_config(
        &self,
        subscription: &str,
        endpoint: &str,
        attributes: HashMap<String, String>,
    ) -> Result<Subscription, BrokerError> {
        let push = PushConfig::parse(endpoint, attributes)?;

        let lock = self.subscriptions.lock(subscription);
        let _guard = lock.lock().await;

        let mut sub = self.subscriptions.get(subscription).await?;
        sub.push = push;
        self.subscriptions.set(&sub).await?;
        Ok(sub)
    }

    /// Append one published message to a subscription queue. Called from
    /// publish fan-out, which holds no other locks at this point.
    pub(crate) async fn append_to_queue(
        &self,
        subscription: &str,
        message_id: &str,
        ack_id: &str,
    ) -> Result<(), BrokerError> {
        let lock = self.subscriptions.lock(subscription);
        let _guard = lock.lock().await;

        let mut sub = self.subscriptions.get(subscription).await?;
        sub.queue.push(QueueEntry {
            message_id: message_id.to_string(),
            ack_id: ack_id.to_string(),
        });
        self.subscriptions.set(&sub).await
    }

    /// Return every expired `delivered` entry to `waiting`. Driven
    /// periodically by the deadline sweeper; returns how many entries
    /// were requeued.
    pub async fn requeue_expired(&self) -> Result<u64, BrokerError> {
        self.requeue_expired_at(Utc::now()).await
    }

    /// Sweep with an explicit instant
    pub async fn requeue_expired_at(&self, now: DateTime<Utc>) -> Result<u64, BrokerError> {
        let mut requeued = 0;
        for stale in self.subscriptions.list().await? {
            let lock = self.subscriptions.lock(&stale.name);
            let _guard = lock.lock().await;

            // Reload under the lock; the subscription may be gone by now
            let sub = match self.subscriptions.get(&stale.name).await {
                Ok(sub) => sub,
                Err(BrokerError::NotFoundSubscription(_)) => continue,
                Err(e) => return Err(e),
            };
            for entry in &sub.queue {
                let result = self
                    .messages
                    .mutate(&entry.message_id, |m| {
                        if m.expired(&sub.name, now) {
                            m.requeue(&sub.name);
                            Ok(true)
                        } else {
                            Ok(false)
                        }
                    })
                    .await;
                match result {
                    Ok((true, _)) => requeued += 1,
                    Ok((false, _)) => {}
                    // A message released between the queue read and the
                    // state update is simply skipped
                    Err(BrokerError::NotFoundMessage(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(requeued)
    }
}
