//! Forwards a change subscription onto an outbound gRPC stream.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use users_sdk::proto::SubscriptionResponse;

use crate::domain::ChangeStream;

pub type Outbound = mpsc::Sender<Result<SubscriptionResponse, Status>>;

/// Drain `changes` into `outbound` until the peer goes away or `cancel` fires.
///
/// Returns `Ok(())` on cancellation or when the peer has hung up. A change
/// that cannot be converted, or a send that fails, is logged and skipped.
///
/// # Errors
/// `Status::internal` when the producer closes `changes` on its own.
pub async fn forward_changes(
    mut changes: ChangeStream,
    outbound: &Outbound,
    cancel: CancellationToken,
) -> Result<(), Status> {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            () = outbound.closed() => return Ok(()),
            next = changes.recv() => next,
        };

        let Some(change) = next else {
            tracing::warn!("change stream closed by producer");
            return Err(Status::internal("subscription channel closed"));
        };

        let msg = match SubscriptionResponse::try_from(&change) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unconvertible change");
                continue;
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            sent = outbound.send(Ok(msg)) => {
                if sent.is_err() {
                    tracing::warn!(user_id = %change.user_id, "failed to send change to subscriber");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use tonic::Code;
    use users_sdk::{ChangeKind, UserChange};
    use uuid::Uuid;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn producer_close_after_delivery_is_internal_error() {
        let (changes_tx, changes) = mpsc::channel(1);
        let (outbound, mut peer) = mpsc::channel(4);
        let change = UserChange::new(Uuid::new_v4(), ChangeKind::Created);

        changes_tx.send(change).await.unwrap();
        drop(changes_tx);

        let status = timeout(WAIT, forward_changes(changes, &outbound, CancellationToken::new()))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);

        let delivered = peer.recv().await.unwrap().unwrap();
        assert_eq!(UserChange::try_from(delivered).unwrap(), change);
    }

    #[tokio::test]
    async fn cancellation_while_idle_ends_cleanly() {
        let (_changes_tx, changes) = mpsc::channel::<UserChange>(1);
        let (outbound, _peer) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { forward_changes(changes, &outbound, cancel).await }
        });
        tokio::task::yield_now().await;
        cancel.cancel();

        let result = timeout(WAIT, task).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unconvertible_change_is_skipped() {
        let (changes_tx, changes) = mpsc::channel(4);
        let (outbound, mut peer) = mpsc::channel(4);
        let good = UserChange::new(Uuid::new_v4(), ChangeKind::Deleted);

        changes_tx
            .send(UserChange::new(Uuid::nil(), ChangeKind::Created))
            .await
            .unwrap();
        changes_tx.send(good).await.unwrap();
        drop(changes_tx);

        let result = timeout(WAIT, forward_changes(changes, &outbound, CancellationToken::new()))
            .await
            .unwrap();
        assert!(result.is_err());

        let delivered = peer.recv().await.unwrap().unwrap();
        assert_eq!(UserChange::try_from(delivered).unwrap(), good);
        assert!(peer.try_recv().is_err());
    }

    #[tokio::test]
    async fn peer_hang_up_ends_cleanly() {
        let (_changes_tx, changes) = mpsc::channel::<UserChange>(1);
        let (outbound, peer) = mpsc::channel(4);
        drop(peer);

        let result = timeout(WAIT, forward_changes(changes, &outbound, CancellationToken::new()))
            .await
            .unwrap();
        assert!(result.is_ok());
    }
}
