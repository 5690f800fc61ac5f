//! Topics and publish fan-out

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::BrokerError;
use super::message::Message;
use super::subscription::Subscription;
use super::{Broker, id};

/// A named broadcast channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
}

impl Broker {
    /// Create a topic; fails if the name is taken
    pub async fn create_topic(&self, name: &str) -> Result<Topic, BrokerError> {
        let topic = self
            .topics
            .create(Topic {
                name: name.to_string(),
            })
            .await?;
        self.stats.add_topics(1);
        tracing::debug!(topic = %topic.name, "Topic created");
        Ok(topic)
    }

    pub async fn get_topic(&self, name: &str) -> Result<Topic, BrokerError> {
        self.topics.get(name).await
    }

    /// All topics, sorted by name
    pub async fn list_topics(&self) -> Result<Vec<Topic>, BrokerError> {
        self.topics.list().await
    }

    /// Delete a topic. Does not cascade: subscriptions keep their queues
    /// and stay individually deletable.
    pub async fn delete_topic(&self, name: &str) -> Result<(), BrokerError> {
        self.topics.get(name).await?;
        self.topics.delete(name).await?;
        self.stats.add_topics(-1);
        tracing::debug!(topic = %name, "Topic deleted");
        Ok(())
    }

    /// Subscriptions attached to one topic
    pub async fn get_subscriptions(&self, topic: &str) -> Result<Vec<Subscription>, BrokerError> {
        self.topics.get(topic).await?;
        self.subscriptions.collect_by_topic(topic).await
    }

    /// Publish a message to every subscription of `topic` and return the
    /// allocated message id.
    ///
    /// The fan-out is not transactional: the message is persisted first,
    /// then appended to each subscription queue in turn; the first append
    /// failure aborts and is returned, with the message left live for the
    /// subscriptions already appended.
    pub async fn publish(
        &self,
        topic: &str,
        data: Vec<u8>,
        attributes: HashMap<String, String>,
    ) -> Result<String, BrokerError> {
        let topic = self.topics.get(topic).await?;
        let targets = self.subscriptions.collect_by_topic(&topic.name).await?;
        let message_id = id::message_id();

        // A message with no target subscriptions has no owners and would
        // be released immediately, so it is never persisted.
        if targets.is_empty() {
            tracing::debug!(topic = %topic.name, message_id = %message_id, "Published to topic without subscriptions");
            return Ok(message_id);
        }

        let ack_ids: Vec<(String, String)> = targets
            .iter()
            .map(|s| (s.name.clone(), id::ack_id()))
            .collect();
        let message = Message::new(
            message_id.clone(),
            data,
            attributes,
            ack_ids.iter().cloned(),
        );
        self.messages.insert(&message).await?;

        for (subscription, ack_id) in &ack_ids {
            self.append_to_queue(subscription, &message_id, ack_id)
                .await?;
            self.stats.add_messages(subscription, 1);
        }

        tracing::debug!(
            topic = %topic.name,
            message_id = %message_id,
            fanout = ack_ids.len(),
            "Message published"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_topic_rejects_duplicate_and_lists_once() {
        let broker = Broker::in_memory();

        broker.create_topic("t").await.unwrap();
        let err = broker.create_topic("t").await.unwrap_err();
        assert!(matches!(err, BrokerError::AlreadyExistTopic(_)));

        let topics = broker.list_topics().await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].name, "t");
    }

    #[tokio::test]
    async fn test_delete_topic_then_publish_fails() {
        let broker = Broker::in_memory();
        broker.create_topic("t").await.unwrap();
        broker.delete_topic("t").await.unwrap();

        let err = broker
            .publish("t", b"x".to_vec(), HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::NotFoundTopic(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_topic() {
        let broker = Broker::in_memory();
        let err = broker.delete_topic("ghost").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFoundTopic(_)));
    }

    #[tokio::test]
    async fn test_publish_without_subscriptions_returns_id() {
        let broker = Broker::in_memory();
        broker.create_topic("t").await.unwrap();

        let message_id = broker
            .publish("t", b"orphan".to_vec(), HashMap::new())
            .await
            .unwrap();
        assert!(message_id.starts_with("msg-"));

        // Nothing was persisted for the ownerless message
        let err = broker.messages.get(&message_id).await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFoundMessage(_)));
    }

    #[tokio::test]
    async fn test_publish_appends_once_per_subscription() {
        let broker = Broker::in_memory();
        broker.create_topic("t").await.unwrap();
        for name in ["s1", "s2", "s3"] {
            broker
                .create_subscription(name, "t", 10, "", HashMap::new())
                .await
                .unwrap();
        }

        let message_id = broker
            .publish("t", b"x".to_vec(), HashMap::new())
            .await
            .unwrap();

        for name in ["s1", "s2", "s3"] {
            let sub = broker.subscriptions.get(name).await.unwrap();
            let hits = sub
                .queue
                .iter()
                .filter(|e| e.message_id == message_id)
                .count();
            assert_eq!(hits, 1, "exactly one queue entry per subscription");
        }

        let snapshot = broker.stats_snapshot();
        assert_eq!(snapshot.messages.get("s1"), Some(&1));
    }

    #[tokio::test]
    async fn test_get_subscriptions_requires_topic() {
        let broker = Broker::in_memory();
        let err = broker.get_subscriptions("ghost").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFoundTopic(_)));
    }
}
