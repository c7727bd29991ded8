//! Trait abstraction for the pub/sub transport to enable testing

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Lifecycle and message events emitted by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Broker accepted the connection
    Connected,
    /// An established connection went away
    Closed(String),
    /// Connecting failed or the transport reported an error
    Error(String),
    /// Publish received on a subscribed topic
    Message { topic: String, payload: Bytes },
}

/// Trait for pub/sub transport operations
///
/// Implementations own connecting, reconnecting and backoff; callers only
/// subscribe and consume events.
#[async_trait]
pub trait Transport: Send {
    /// Subscribe to a topic filter
    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Wait for the next event; `None` once the transport has shut down
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

/// MQTT topic filter matching with `+` and `#` wildcards
///
/// Topics starting with `$` are not matched by a leading wildcard.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
