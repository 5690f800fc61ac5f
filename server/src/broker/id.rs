//! Message and ack id allocation
//!
//! Ids are opaque strings: a 128-bit random value in hex, prefixed so the
//! message-id and ack-id namespaces can never collide. Randomness keeps
//! allocation independent of clock skew.

use uuid::Uuid;

/// Allocate a new message id
pub fn message_id() -> String {
    format!("msg-{}", Uuid::new_v4().simple())
}

/// Allocate a new ack id
pub fn ack_id() -> String {
    format!("ack-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_prefixes_keep_namespaces_disjoint() {
        assert!(message_id().starts_with("msg-"));
        assert!(ack_id().starts_with("ack-"));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| message_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
