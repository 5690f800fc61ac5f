//! Pluggable broker counters
//!
//! The broker reports entity lifecycle events to a [`StatsSink`]; the
//! default [`ProcessStats`] keeps process-local atomic counters exposed
//! read-only over the stats endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use utoipa::ToSchema;

/// Counter hooks invoked by the broker
pub trait StatsSink: Send + Sync {
    fn add_topics(&self, delta: i64);
    fn add_subscriptions(&self, delta: i64);
    /// Undelivered-message count for one subscription
    fn add_messages(&self, subscription: &str, delta: i64);
    fn snapshot(&self) -> StatsSnapshot;
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct StatsSnapshot {
    pub topics: i64,
    pub subscriptions: i64,
    /// Pending message count per subscription
    pub messages: HashMap<String, i64>,
}

/// Process-local counters
#[derive(Default)]
pub struct ProcessStats {
    topics: AtomicI64,
    subscriptions: AtomicI64,
    messages: DashMap<String, AtomicI64>,
}

impl ProcessStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsSink for ProcessStats {
    fn add_topics(&self, delta: i64) {
        self.topics.fetch_add(delta, Ordering::Relaxed);
    }

    fn add_subscriptions(&self, delta: i64) {
        self.subscriptions.fetch_add(delta, Ordering::Relaxed);
    }

    fn add_messages(&self, subscription: &str, delta: i64) {
        self.messages
            .entry(subscription.to_string())
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            topics: self.topics.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
            messages: self
                .messages
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = ProcessStats::new();
        stats.add_topics(1);
        stats.add_topics(1);
        stats.add_subscriptions(1);
        stats.add_messages("s1", 3);
        stats.add_messages("s1", -1);
        stats.add_messages("s2", 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.topics, 2);
        assert_eq!(snapshot.subscriptions, 1);
        assert_eq!(snapshot.messages.get("s1"), Some(&2));
        assert_eq!(snapshot.messages.get("s2"), Some(&1));
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = ProcessStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
