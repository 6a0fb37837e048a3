//! NATS-backed broker.

use std::sync::atomic::{AtomicBool, Ordering};

use async_nats::{Client, Subject, Subscriber};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::broker::{Broker, BrokerError, BrokerSubscription};

/// Broker speaking the NATS core protocol. NATS natively implements the
/// token wildcard semantics the topics rely on.
pub struct NatsBroker {
    client: Client,
    closed: AtomicBool,
}

impl NatsBroker {
    /// # Errors
    /// Returns `BrokerError::Connect` if the server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BrokerError::Connect {
                url: url.to_owned(),
                message: e.to_string(),
            })?;
        tracing::info!(%url, "connected to NATS");

        Ok(Self {
            client,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for NatsBroker {
    async fn publish(&self, topic: String, payload: Bytes) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.client
            .publish(Subject::from(topic.clone()), payload)
            .await
            .map_err(|e| BrokerError::Publish {
                topic,
                message: e.to_string(),
            })
    }

    async fn subscribe(&self, pattern: String) -> Result<Box<dyn BrokerSubscription>, BrokerError> {
        self.ensure_open()?;
        let inner = self
            .client
            .subscribe(Subject::from(pattern.clone()))
            .await
            .map_err(|e| BrokerError::Subscribe {
                topic: pattern,
                message: e.to_string(),
            })?;
        Ok(Box::new(NatsSubscription { inner }))
    }

    /// Drains every subscription, flushes pending publishes and closes the
    /// connection.
    async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client
            .drain()
            .await
            .map_err(|e| BrokerError::Close(e.to_string()))?;
        tracing::info!("NATS connection drained");
        Ok(())
    }
}

struct NatsSubscription {
    inner: Subscriber,
}

#[async_trait]
impl BrokerSubscription for NatsSubscription {
    async fn next_message(&mut self) -> Result<Option<Bytes>, BrokerError> {
        // The subscriber stream only ends once it is drained or the
        // connection is gone.
        match self.inner.next().await {
            Some(msg) => Ok(Some(msg.payload)),
            None => Err(BrokerError::Closed),
        }
    }
}

/// Needs a reachable server: `NATS_URL=nats://localhost:4222 cargo test -- --ignored`.
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    async fn connect() -> NatsBroker {
        let url = std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_owned());
        NatsBroker::connect(&url).await.expect("NATS server reachable")
    }

    #[tokio::test]
    #[ignore = "requires a NATS server"]
    async fn wildcard_subscription_receives_matching_publish() {
        let broker = connect().await;
        let id = uuid::Uuid::new_v4();
        let mut sub = broker
            .subscribe(format!("users.*.{id}"))
            .await
            .unwrap();

        broker
            .publish(format!("users.DELETED.{}", uuid::Uuid::new_v4()), Bytes::from_static(b"no"))
            .await
            .unwrap();
        broker
            .publish(format!("users.UPDATED.{id}"), Bytes::from_static(b"yes"))
            .await
            .unwrap();

        let got = tokio::time::timeout(WAIT, sub.next_message())
            .await
            .expect("message within timeout")
            .unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"yes")));

        broker.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a NATS server"]
    async fn close_ends_subscriptions_and_rejects_use() {
        let broker = connect().await;
        let mut sub = broker.subscribe("users.>".to_owned()).await.unwrap();

        broker.close().await.unwrap();
        broker.close().await.unwrap();

        let ended = tokio::time::timeout(WAIT, sub.next_message())
            .await
            .expect("subscription ends after close");
        assert!(matches!(ended, Err(BrokerError::Closed)));
        assert!(matches!(
            broker
                .publish("users.CREATED.a".to_owned(), Bytes::new())
                .await
                .unwrap_err(),
            BrokerError::Closed
        ));
        assert!(matches!(
            broker.subscribe("users.>".to_owned()).await.err(),
            Some(BrokerError::Closed)
        ));
    }
}
