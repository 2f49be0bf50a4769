//! Message broker collaborators.
//!
//! The wait core only needs three operations from a broker: open a
//! subscription, attach a delivery callback to it, and release it. Publishing
//! fixtures goes through the separate [`Publisher`] trait and is
//! fire-and-forget.
//!
//! [`InMemoryBroker`] implements both traits with per-topic retention and a
//! delivery thread per subscription.

mod inmemory;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use inmemory::InMemoryBroker;

/// Callback invoked on a broker-owned thread for every delivered payload.
pub type MessageCallback = Box<dyn Fn(&Bytes) + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Invalid topic name: '{0}'")]
    InvalidTopic(String),
    #[error("Subscription {0} not found")]
    UnknownSubscription(u64),
    #[error("Subscription {0} already has a message callback")]
    CallbackAlreadyRegistered(u64),
    #[error("Failed to start delivery for subscription {id}: {source}")]
    Delivery {
        id: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Where a fresh subscription starts reading a topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    /// Replay every message the topic has retained, then follow new ones
    #[default]
    Earliest,
    /// Only messages published after the subscription was opened
    Latest,
}

/// Identifies one live subscription. Owned by exactly one waiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    topic: String,
}

impl SubscriptionHandle {
    pub fn new(id: u64, topic: impl Into<String>) -> Self {
        Self {
            id,
            topic: topic.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.topic, self.id)
    }
}

/// Subscribe side of a broker client.
pub trait Broker: Send + Sync {
    /// Open a subscription on `topic`. Messages are buffered for it from this
    /// point on (plus retained ones, depending on the broker's offset reset).
    fn subscribe(&self, topic: &str) -> Result<SubscriptionHandle, BrokerError>;

    /// Start delivering buffered and future messages to `callback`.
    fn on_message(
        &self,
        handle: &SubscriptionHandle,
        callback: MessageCallback,
    ) -> Result<(), BrokerError>;

    /// Release the subscription. Idempotent, and safe to call on a handle that
    /// never had a callback attached.
    fn unsubscribe(&self, handle: &SubscriptionHandle);
}

/// Publish side of a broker client.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BrokerError>;
}

/// Reject empty topic names and names with whitespace or control characters.
pub(crate) fn validate_topic(topic: &str) -> Result<(), BrokerError> {
    if topic.is_empty() || topic.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(BrokerError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}
