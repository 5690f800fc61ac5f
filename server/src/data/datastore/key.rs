//! Datastore key namespacing
//!
//! Every entity lives under a fixed key prefix so that `dump` can
//! reconstruct typed records per namespace.

/// Key prefix for topic records
pub const TOPIC_PREFIX: &str = "topic/";

/// Key prefix for subscription records
pub const SUBSCRIPTION_PREFIX: &str = "subscription/";

/// Key prefix for message records
pub const MESSAGE_PREFIX: &str = "message/";

/// Key for a topic record
pub fn topic(name: &str) -> String {
    format!("{TOPIC_PREFIX}{name}")
}

/// Key for a subscription record
pub fn subscription(name: &str) -> String {
    format!("{SUBSCRIPTION_PREFIX}{name}")
}

/// Key for a message record
pub fn message(id: &str) -> String {
    format!("{MESSAGE_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespaces_disjoint() {
        assert_eq!(topic("a"), "topic/a");
        assert_eq!(subscription("a"), "subscription/a");
        assert_eq!(message("a"), "message/a");
        assert!(!topic("a").starts_with(SUBSCRIPTION_PREFIX));
        assert!(!subscription("a").starts_with(MESSAGE_PREFIX));
    }
}
