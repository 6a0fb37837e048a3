//! `ChangeBus` implementation over a raw `Broker`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use users_sdk::{SubscriptionFilter, UserChange};

use super::broker::{Broker, BrokerError, BrokerSubscription};
use super::codec::{self, CodecError};
use super::topic;
use crate::domain::{ChangeBus, ChangeStream, DomainError};

/// Deliveries are handed over one at a time; a slow consumer back-pressures
/// the delivery task instead of buffering.
const DELIVERY_BUFFER: usize = 1;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("change for nil user id cannot be published")]
    NotPublishable,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl From<BusError> for DomainError {
    fn from(e: BusError) -> Self {
        DomainError::unknown(e)
    }
}

#[derive(Clone)]
pub struct BusClient {
    broker: Arc<dyn Broker>,
}

impl BusClient {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl ChangeBus for BusClient {
    async fn publish(&self, change: UserChange) -> Result<(), DomainError> {
        if !change.is_publishable() {
            return Err(BusError::NotPublishable.into());
        }
        let payload = codec::encode(&change).map_err(BusError::from)?;
        let topic = topic::for_publish(&change);

        self.broker
            .publish(topic.clone(), payload)
            .await
            .map_err(BusError::from)?;
        tracing::debug!(%topic, "change published");
        Ok(())
    }

    async fn subscribe(
        &self,
        filter: SubscriptionFilter,
        cancel: CancellationToken,
    ) -> Result<ChangeStream, DomainError> {
        let topic = topic::for_subscribe(&filter)?;
        let subscription = self
            .broker
            .subscribe(topic.clone())
            .await
            .map_err(BusError::from)?;

        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        tracing::debug!(%topic, "bus subscription opened");
        tokio::spawn(deliver(subscription, tx, cancel, topic));
        Ok(rx)
    }

    async fn shutdown(&self) {
        if let Err(e) = self.broker.close().await {
            tracing::warn!(error = %e, "failed to close broker connection");
        }
    }
}

/// Pumps decoded changes into `tx` until cancelled, the consumer goes away,
/// or the broker closes. Dropping `tx` on exit closes the stream.
async fn deliver(
    mut subscription: Box<dyn BrokerSubscription>,
    tx: mpsc::Sender<UserChange>,
    cancel: CancellationToken,
    topic: String,
) {
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = subscription.next_message() => received,
        };

        let payload = match received {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(BrokerError::Closed) => {
                tracing::info!(%topic, "broker closed, ending subscription");
                break;
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::warn!(%topic, error = %e, "failed to receive change, skipping");
                continue;
            }
        };

        let change = match codec::decode(&payload) {
            Ok(change) => change,
            Err(e) => {
                tracing::warn!(%topic, error = %e, "failed to decode change, skipping");
                continue;
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(change) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!(%topic, "bus subscription closed");
}
