use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("failed to connect to broker at '{url}': {message}")]
    Connect { url: String, message: String },

    #[error("failed to publish on '{topic}': {message}")]
    Publish { topic: String, message: String },

    #[error("failed to subscribe to '{topic}': {message}")]
    Subscribe { topic: String, message: String },

    #[error("failed to receive message: {0}")]
    Receive(String),

    #[error("failed to close broker connection: {0}")]
    Close(String),

    #[error("broker connection closed")]
    Closed,
}

/// Raw publish/subscribe transport.
///
/// Implementations must tolerate concurrent use from any number of tasks.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: String, payload: Bytes) -> Result<(), BrokerError>;

    /// `pattern` may contain single-token `*` wildcards.
    async fn subscribe(&self, pattern: String) -> Result<Box<dyn BrokerSubscription>, BrokerError>;

    /// Close the connection. Calling it again is a no-op.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Handle to one broker-level subscription, owned by a single consumer.
#[async_trait]
pub trait BrokerSubscription: Send {
    /// Wait for the next raw message.
    ///
    /// `Ok(None)` is a spurious wakeup. `Err(BrokerError::Closed)` means no
    /// further messages will ever arrive; any other error is transient.
    async fn next_message(&mut self) -> Result<Option<Bytes>, BrokerError>;
}
