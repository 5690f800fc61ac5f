//! Message record and per-subscription ack-state machine
//!
//! A message is stored once and referenced by id from every subscription
//! of its topic. The `states` map tracks one delivery attempt per target
//! subscription:
//!
//! ```text
//!            pull (claim)             ack
//!   waiting ────────────▶ delivered ─────▶ acked (terminal)
//!      ▲                      │
//!      └── deadline expiry ───┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::BrokerError;

/// Ack state of one (message, subscription) entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckState {
    /// Eligible for the next pull
    Waiting,
    /// Claimed by a puller, hidden until the deadline passes
    Delivered,
    /// Terminal
    Acked,
}

/// Delivery state of a message for one target subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryState {
    pub ack_id: String,
    pub state: AckState,
    /// Meaningful only while `Delivered`
    pub deadline: Option<DateTime<Utc>>,
}

impl DeliveryState {
    fn new(ack_id: String) -> Self {
        Self {
            ack_id,
            state: AckState::Waiting,
            deadline: None,
        }
    }
}

/// A single publish event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub published_at: DateTime<Utc>,
    /// Delivery state per target subscription, keyed by subscription name
    pub states: HashMap<String, DeliveryState>,
}

impl Message {
    /// Build a message with the delivery-state map seeded to `waiting`
    /// for every `(subscription, ack_id)` target.
    pub fn new(
        id: String,
        data: Vec<u8>,
        attributes: HashMap<String, String>,
        targets: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            id,
            data,
            attributes,
            published_at: Utc::now(),
            states: targets
                .into_iter()
                .map(|(subscription, ack_id)| (subscription, DeliveryState::new(ack_id)))
                .collect(),
        }
    }

    pub fn state(&self, subscription: &str) -> Option<&DeliveryState> {
        self.states.get(subscription)
    }

    /// Whether this message can be handed to a puller of `subscription`:
    /// `waiting`, or `delivered` with an elapsed deadline.
    pub fn deliverable(&self, subscription: &str, now: DateTime<Utc>) -> bool {
        match self.states.get(subscription) {
            Some(entry) => match entry.state {
                AckState::Waiting => true,
                AckState::Delivered => entry.deadline.is_some_and(|d| d <= now),
                AckState::Acked => false,
            },
            None => false,
        }
    }

    /// Whether the `delivered` entry for `subscription` has outlived its
    /// deadline and should be returned to `waiting`.
    pub fn expired(&self, subscription: &str, now: DateTime<Utc>) -> bool {
        self.states.get(subscription).is_some_and(|entry| {
            entry.state == AckState::Delivered && entry.deadline.is_some_and(|d| d <= now)
        })
    }

    /// Claim the entry for a puller. The deadline must be in the future.
    pub fn mark_delivered(&mut self, subscription: &str, deadline: DateTime<Utc>) {
        if let Some(entry) = self.states.get_mut(subscription) {
            entry.state = AckState::Delivered;
            entry.deadline = Some(deadline);
        }
    }

    /// Transition `delivered → acked`.
    ///
    /// Acking a `waiting` entry is a misuse; acking an already-`acked`
    /// entry is reported as such. `ack_id` is only used for error context.
    pub fn mark_acked(&mut self, subscription: &str, ack_id: &str) -> Result<(), BrokerError> {
        let entry = self
            .states
            .get_mut(subscription)
            .ok_or_else(|| BrokerError::NotFoundAckId(ack_id.to_string()))?;
        match entry.state {
            AckState::Waiting => Err(BrokerError::NotYetReceivedAck(ack_id.to_string())),
            AckState::Acked => Err(BrokerError::AlreadyReadMessage(ack_id.to_string())),
            AckState::Delivered => {
                entry.state = AckState::Acked;
                entry.deadline = None;
                Ok(())
            }
        }
    }

    /// Return a `delivered` entry to `waiting` (deadline expiry, or an
    /// explicit modify-ack to zero).
    pub fn requeue(&mut self, subscription: &str) {
        if let Some(entry) = self.states.get_mut(subscription)
            && entry.state == AckState::Delivered
        {
            entry.state = AckState::Waiting;
            entry.deadline = None;
        }
    }

    /// Move the deadline of a `delivered` entry
    pub fn set_deadline(&mut self, subscription: &str, deadline: DateTime<Utc>) {
        if let Some(entry) = self.states.get_mut(subscription)
            && entry.state == AckState::Delivered
        {
            entry.deadline = Some(deadline);
        }
    }

    /// Whether every target subscription has acked; a fully-acked message
    /// is removed from the message store.
    pub fn fully_acked(&self) -> bool {
        self.states
            .values()
            .all(|entry| entry.state == AckState::Acked)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn message(targets: &[(&str, &str)]) -> Message {
        Message::new(
            "msg-1".to_string(),
            b"payload".to_vec(),
            HashMap::new(),
            targets
                .iter()
                .map(|(s, a)| (s.to_string(), a.to_string())),
        )
    }

    #[test]
    fn test_new_message_waits_for_every_target() {
        let msg = message(&[("s1", "ack-1"), ("s2", "ack-2")]);
        assert_eq!(msg.state("s1").unwrap().state, AckState::Waiting);
        assert_eq!(msg.state("s2").unwrap().state, AckState::Waiting);
        assert!(msg.deliverable("s1", Utc::now()));
        assert!(!msg.deliverable("unknown", Utc::now()));
    }

    #[test]
    fn test_delivered_hides_until_deadline() {
        let mut msg = message(&[("s1", "ack-1")]);
        let now = Utc::now();

        msg.mark_delivered("s1", now + Duration::seconds(10));
        assert!(!msg.deliverable("s1", now));
        assert!(!msg.expired("s1", now));

        // After the deadline the entry is eligible again
        let later = now + Duration::seconds(11);
        assert!(msg.deliverable("s1", later));
        assert!(msg.expired("s1", later));
    }

    #[test]
    fn test_ack_requires_delivery() {
        let mut msg = message(&[("s1", "ack-1")]);
        let err = msg.mark_acked("s1", "ack-1").unwrap_err();
        assert!(matches!(err, BrokerError::NotYetReceivedAck(_)));
    }

    #[test]
    fn test_ack_is_terminal() {
        let mut msg = message(&[("s1", "ack-1")]);
        msg.mark_delivered("s1", Utc::now() + Duration::seconds(10));
        msg.mark_acked("s1", "ack-1").unwrap();

        let err = msg.mark_acked("s1", "ack-1").unwrap_err();
        assert!(matches!(err, BrokerError::AlreadyReadMessage(_)));

        // An acked entry never becomes deliverable again
        assert!(!msg.deliverable("s1", Utc::now() + Duration::days(1)));
    }

    #[test]
    fn test_requeue_returns_entry_to_waiting() {
        let mut msg = message(&[("s1", "ack-1")]);
        let now = Utc::now();
        msg.mark_delivered("s1", now + Duration::seconds(60));
        assert!(!msg.deliverable("s1", now));

        msg.requeue("s1");
        assert!(msg.deliverable("s1", now));
        assert!(msg.state("s1").unwrap().deadline.is_none());
    }

    #[test]
    fn test_requeue_ignores_waiting_and_acked() {
        let mut msg = message(&[("s1", "ack-1")]);
        msg.requeue("s1");
        assert_eq!(msg.state("s1").unwrap().state, AckState::Waiting);

        msg.mark_delivered("s1", Utc::now() + Duration::seconds(10));
        msg.mark_acked("s1", "ack-1").unwrap();
        msg.requeue("s1");
        assert_eq!(msg.state("s1").unwrap().state, AckState::Acked);
    }

    #[test]
    fn test_fully_acked() {
        let mut msg = message(&[("s1", "ack-1"), ("s2", "ack-2")]);
        let deadline = Utc::now() + Duration::seconds(10);

        msg.mark_delivered("s1", deadline);
        msg.mark_acked("s1", "ack-1").unwrap();
        assert!(!msg.fully_acked());

        msg.mark_delivered("s2", deadline);
        msg.mark_acked("s2", "ack-2").unwrap();
        assert!(msg.fully_acked());
    }
}
