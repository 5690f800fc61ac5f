//! Message-delivery engine
//!
//! The topic/subscription data model, per-subscription queues with the
//! ack-state machine, publish fan-out, deadline-driven redelivery, and
//! push delivery. All state lives behind the pluggable datastore; a
//! [`Broker`] is explicitly constructed per process (or per test) and
//! shared as `Arc<Broker>`.

pub mod error;
mod id;
pub mod message;
pub mod push;
mod record;
mod registry;
pub mod stats;
pub mod subscription;
pub mod sweeper;
pub mod topic;

use std::sync::Arc;

pub use error::BrokerError;
pub use message::{AckState, Message};
pub use push::PushDeliverer;
pub use stats::{ProcessStats, StatsSink, StatsSnapshot};
pub use subscription::{PulledMessage, PushConfig, Subscription};
pub use sweeper::DeadlineSweeper;
pub use topic::Topic;

use registry::{MessageRegistry, SubscriptionRegistry, TopicRegistry};

use crate::data::datastore::{Datastore, MemoryStore};

/// Broker state: the three entity registries plus the stats sink.
///
/// The registries are the only legal mutation path for their entities.
pub struct Broker {
    pub(crate) topics: TopicRegistry,
    pub(crate) subscriptions: SubscriptionRegistry,
    pub(crate) messages: MessageRegistry,
    pub(crate) stats: Arc<dyn StatsSink>,
}

impl Broker {
    pub fn new(store: Arc<dyn Datastore>, stats: Arc<dyn StatsSink>) -> Self {
        let (topics, subscriptions, messages) = registry::build(store);
        Self {
            topics,
            subscriptions,
            messages,
            stats,
        }
    }

    /// Broker over a fresh in-memory store with process-local stats
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ProcessStats::new()),
        )
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
