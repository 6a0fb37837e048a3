//! In-process broker built on `tokio::sync::broadcast`.
//!
//! Applies the same token wildcard matching as NATS. Used by `--mock` runs
//! and tests.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::broker::{Broker, BrokerError, BrokerSubscription};
use super::topic;

type Envelope = (String, Bytes);

pub struct MemoryBroker {
    tx: RwLock<Option<broadcast::Sender<Envelope>>>,
}

impl MemoryBroker {
    /// `capacity` is the broadcast buffer; slow subscribers lag past it.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx: RwLock::new(Some(tx)),
        }
    }

    fn sender(&self) -> Result<broadcast::Sender<Envelope>, BrokerError> {
        self.tx.read().clone().ok_or(BrokerError::Closed)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, topic: String, payload: Bytes) -> Result<(), BrokerError> {
        // No subscribers is not an error; the message is simply dropped.
        let _ = self.sender()?.send((topic, payload));
        Ok(())
    }

    async fn subscribe(&self, pattern: String) -> Result<Box<dyn BrokerSubscription>, BrokerError> {
        let rx = self.sender()?.subscribe();
        Ok(Box::new(MemorySubscription { pattern, rx }))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.tx.write().take();
        Ok(())
    }
}

struct MemorySubscription {
    pattern: String,
    rx: broadcast::Receiver<Envelope>,
}

#[async_trait]
impl BrokerSubscription for MemorySubscription {
    async fn next_message(&mut self) -> Result<Option<Bytes>, BrokerError> {
        match self.rx.recv().await {
            Ok((topic, payload)) if topic::matches(&self.pattern, &topic) => Ok(Some(payload)),
            Ok(_) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(BrokerError::Receive(
                format!("subscriber lagged, {skipped} messages skipped"),
            )),
            Err(broadcast::error::RecvError::Closed) => Err(BrokerError::Closed),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_only_matching_topics() {
        let broker = MemoryBroker::new(8);
        let mut sub = broker.subscribe("users.CREATED.*".to_owned()).await.unwrap();

        broker
            .publish("users.DELETED.a".to_owned(), Bytes::from_static(b"no"))
            .await
            .unwrap();
        broker
            .publish("users.CREATED.a".to_owned(), Bytes::from_static(b"yes"))
            .await
            .unwrap();

        assert_eq!(sub.next_message().await.unwrap(), None);
        assert_eq!(
            sub.next_message().await.unwrap(),
            Some(Bytes::from_static(b"yes"))
        );
    }

    #[tokio::test]
    async fn lagging_is_transient() {
        let broker = MemoryBroker::new(1);
        let mut sub = broker.subscribe("users.*.*".to_owned()).await.unwrap();
        for n in 0..3u8 {
            broker
                .publish("users.CREATED.a".to_owned(), Bytes::from(vec![n]))
                .await
                .unwrap();
        }

        assert!(matches!(
            sub.next_message().await.unwrap_err(),
            BrokerError::Receive(_)
        ));
        assert_eq!(sub.next_message().await.unwrap(), Some(Bytes::from(vec![2])));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_ends_subscriptions() {
        let broker = MemoryBroker::new(8);
        let mut sub = broker.subscribe("users.*.*".to_owned()).await.unwrap();

        broker.close().await.unwrap();
        broker.close().await.unwrap();

        assert!(matches!(
            sub.next_message().await.unwrap_err(),
            BrokerError::Closed
        ));
        assert!(matches!(
            broker
                .publish("users.CREATED.a".to_owned(), Bytes::new())
                .await
                .unwrap_err(),
            BrokerError::Closed
        ));
    }
}
