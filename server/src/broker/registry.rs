//! Entity registries over the datastore
//!
//! Each registry owns one key prefix and is the only mutation path for its
//! entities. Index access is serialized per registry; subscriptions
//! additionally carry a fine-grained per-name lock covering their queue
//! and the ack-state of their entries. Lock order is
//! registry → subscription → message.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::error::BrokerError;
use super::message::Message;
use super::record::Record;
use super::subscription::Subscription;
use super::topic::Topic;
use crate::data::datastore::{Datastore, key};

/// Topic records under `topic/`
pub struct TopicRegistry {
    store: Arc<dyn Datastore>,
    guard: Mutex<()>,
}

impl TopicRegistry {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    /// Persist a new topic; fails if the name is taken
    pub async fn create(&self, topic: Topic) -> Result<Topic, BrokerError> {
        let _guard = self.guard.lock().await;
        let store_key = key::topic(&topic.name);
        match self.store.get(&store_key).await {
            Ok(_) => Err(BrokerError::AlreadyExistTopic(topic.name)),
            Err(e) if e.is_not_found() => {
                let bytes = Record::Topic(topic.clone()).encode()?;
                self.store.set(&store_key, bytes).await?;
                Ok(topic)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<Topic, BrokerError> {
        let store_key = key::topic(name);
        match self.store.get(&store_key).await {
            Ok(bytes) => Ok(Record::decode(&store_key, &bytes)?.into_topic(&store_key)?),
            Err(e) if e.is_not_found() => Err(BrokerError::NotFoundTopic(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// All topics, sorted by name
    pub async fn list(&self) -> Result<Vec<Topic>, BrokerError> {
        let mut topics = Vec::new();
        for (store_key, bytes) in self.store.dump(key::TOPIC_PREFIX).await? {
            topics.push(Record::decode(&store_key, &bytes)?.into_topic(&store_key)?);
        }
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(topics)
    }

    pub async fn delete(&self, name: &str) -> Result<(), BrokerError> {
        let _guard = self.guard.lock().await;
        Ok(self.store.delete(&key::topic(name)).await?)
    }
}

/// Subscription records under `subscription/`, plus the per-subscription
/// lock table.
pub struct SubscriptionRegistry {
    store: Arc<dyn Datastore>,
    guard: Mutex<()>,
    /// One mutex per subscription name. Entries are kept for the life of
    /// the process so that concurrent holders always contend on the same
    /// lock, even across delete/recreate.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SubscriptionRegistry {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
            locks: DashMap::new(),
        }
    }

    /// The fine-grained mutex for one subscription
    pub fn lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Persist a new subscription; fails if the name is taken
    pub async fn create(&self, subscription: Subscription) -> Result<Subscription, BrokerError> {
        let _guard = self.guard.lock().await;
        let store_key = key::subscription(&subscription.name);
        match self.store.get(&store_key).await {
            Ok(_) => Err(BrokerError::AlreadyExistSubscription(subscription.name)),
            Err(e) if e.is_not_found() => {
                let bytes = Record::Subscription(subscription.clone()).encode()?;
                self.store.set(&store_key, bytes).await?;
                Ok(subscription)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<Subscription, BrokerError> {
        let store_key = key::subscription(name);
        match self.store.get(&store_key).await {
            Ok(bytes) => Ok(Record::decode(&store_key, &bytes)?.into_subscription(&store_key)?),
            Err(e) if e.is_not_found() => Err(BrokerError::NotFoundSubscription(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite an existing subscription record. Callers must hold the
    /// subscription's lock.
    pub async fn set(&self, subscription: &Subscription) -> Result<(), BrokerError> {
        let store_key = key::subscription(&subscription.name);
        let bytes = Record::Subscription(subscription.clone()).encode()?;
        Ok(self.store.set(&store_key, bytes).await?)
    }

    /// All subscriptions, sorted by name
    pub async fn list(&self) -> Result<Vec<Subscription>, BrokerError> {
        let mut subscriptions = Vec::new();
        for (store_key, bytes) in self.store.dump(key::SUBSCRIPTION_PREFIX).await? {
            subscriptions
                .push(Record::decode(&store_key, &bytes)?.into_subscription(&store_key)?);
        }
        subscriptions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subscriptions)
    }

    /// Subscriptions attached to one topic, sorted by name
    pub async fn collect_by_topic(&self, topic: &str) -> Result<Vec<Subscription>, BrokerError> {
        let mut subscriptions = self.list().await?;
        subscriptions.retain(|s| s.topic_id == topic);
        Ok(subscriptions)
    }

    pub async fn delete(&self, name: &str) -> Result<(), BrokerError> {
        let _guard = self.guard.lock().await;
        Ok(self.store.delete(&key::subscription(name)).await?)
    }
}

/// Message records under `message/`
pub struct MessageRegistry {
    store: Arc<dyn Datastore>,
    guard: Mutex<()>,
}

impl MessageRegistry {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    pub async fn insert(&self, message: &Message) -> Result<(), BrokerError> {
        let _guard = self.guard.lock().await;
        let store_key = key::message(&message.id);
        let bytes = Record::Message(message.clone()).encode()?;
        Ok(self.store.set(&store_key, bytes).await?)
    }

    /// Direct lookup, used by tests to observe message release
    #[cfg(test)]
    pub async fn get(&self, id: &str) -> Result<Message, BrokerError> {
        let store_key = key::message(id);
        match self.store.get(&store_key).await {
            Ok(bytes) => Ok(Record::decode(&store_key, &bytes)?.into_message(&store_key)?),
            Err(e) if e.is_not_found() => Err(BrokerError::NotFoundMessage(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Serialized read-modify-write of one message's delivery state.
    ///
    /// The closure's mutation is persisted only if it succeeds; a message
    /// left fully acked is released from the store instead.
    pub async fn mutate<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Message) -> Result<R, BrokerError>,
    ) -> Result<(R, Message), BrokerError> {
        let _guard = self.guard.lock().await;
        let store_key = key::message(id);
        let bytes = match self.store.get(&store_key).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                return Err(BrokerError::NotFoundMessage(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut message = Record::decode(&store_key, &bytes)?.into_message(&store_key)?;

        let result = f(&mut message)?;

        if message.fully_acked() {
            self.store.delete(&store_key).await?;
        } else {
            let bytes = Record::Message(message.clone()).encode()?;
            self.store.set(&store_key, bytes).await?;
        }
        Ok((result, message))
    }
}

/// Build the three registries over one shared datastore
pub fn build(
    store: Arc<dyn Datastore>,
) -> (TopicRegistry, SubscriptionRegistry, MessageRegistry) {
    (
        TopicRegistry::new(Arc::clone(&store)),
        SubscriptionRegistry::new(Arc::clone(&store)),
        MessageRegistry::new(store),
    )
}

/// Registries over a fresh in-memory store
#[cfg(test)]
pub fn build_in_memory() -> (TopicRegistry, SubscriptionRegistry, MessageRegistry) {
    build(Arc::new(crate::data::datastore::MemoryStore::new()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Duration, Utc};

    use super::*;

    fn topic(name: &str) -> Topic {
        Topic {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_topic_rejects_duplicate() {
        let (topics, _, _) = build_in_memory();

        topics.create(topic("a")).await.unwrap();
        let err = topics.create(topic("a")).await.unwrap_err();
        assert!(matches!(err, BrokerError::AlreadyExistTopic(name) if name == "a"));
    }

    #[tokio::test]
    async fn test_get_missing_topic() {
        let (topics, _, _) = build_in_memory();
        let err = topics.get("ghost").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFoundTopic(_)));
    }

    #[tokio::test]
    async fn test_list_topics_sorted() {
        let (topics, _, _) = build_in_memory();
        topics.create(topic("b")).await.unwrap();
        topics.create(topic("a")).await.unwrap();

        let names: Vec<String> = topics.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_missing_topic_is_noop() {
        let (topics, _, _) = build_in_memory();
        topics.delete("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_collect_by_topic() {
        let (_, subscriptions, _) = build_in_memory();
        for (name, topic_id) in [("s2", "t1"), ("s1", "t1"), ("s3", "t2")] {
            subscriptions
                .create(Subscription::new(name.to_string(), topic_id.to_string(), 10, None))
                .await
                .unwrap();
        }

        let names: Vec<String> = subscriptions
            .collect_by_topic("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_mutate_releases_fully_acked_message() {
        let (_, _, messages) = build_in_memory();
        let message = Message::new(
            "msg-1".to_string(),
            b"x".to_vec(),
            HashMap::new(),
            [("s1".to_string(), "ack-1".to_string())],
        );
        messages.insert(&message).await.unwrap();

        let deadline = Utc::now() + Duration::seconds(10);
        messages
            .mutate("msg-1", |m| {
                m.mark_delivered("s1", deadline);
                Ok(())
            })
            .await
            .unwrap();
        messages
            .mutate("msg-1", |m| m.mark_acked("s1", "ack-1"))
            .await
            .unwrap();

        let err = messages.get("msg-1").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotFoundMessage(_)));
    }

    #[tokio::test]
    async fn test_mutate_does_not_persist_failed_transition() {
        let (_, _, messages) = build_in_memory();
        let message = Message::new(
            "msg-1".to_string(),
            b"x".to_vec(),
            HashMap::new(),
            [("s1".to_string(), "ack-1".to_string())],
        );
        messages.insert(&message).await.unwrap();

        // Acking a waiting entry is refused and leaves the record alone
        let err = messages
            .mutate("msg-1", |m| m.mark_acked("s1", "ack-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::NotYetReceivedAck(_)));
        assert_eq!(messages.get("msg-1").await.unwrap(), message);
    }
}
