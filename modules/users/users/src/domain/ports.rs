use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use users_sdk::{Paging, SubscriptionFilter, UpdateUserFields, User, UserChange, UserFilter};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Live, single-consumer stream of change notifications.
///
/// The producer closes it when its subscription ends.
pub type ChangeStream = mpsc::Receiver<UserChange>;

/// Persistence contract for user records.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a new user. Fails with `DuplicateUserId` if the id is taken.
    async fn add(&self, user: &User) -> Result<(), DomainError>;

    /// Apply `fields` to the first user (in insertion order) matching `filter`
    /// and return the updated row.
    ///
    /// A present, empty field clears the stored value. Fails with `NotFound`
    /// when nothing matches.
    async fn update_partial(
        &self,
        filter: &UserFilter,
        fields: &UpdateUserFields,
    ) -> Result<User, DomainError>;

    /// Permanently remove a user. Removing an absent id succeeds.
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    /// One page of matching users in insertion order, plus the total number
    /// of matches regardless of paging.
    async fn list(
        &self,
        filter: &UserFilter,
        paging: Paging,
    ) -> Result<(Vec<User>, u64), DomainError>;

    /// Release the underlying connection.
    async fn shutdown(&self) -> Result<(), DomainError>;
}

/// Publish/subscribe contract for user change notifications.
#[async_trait]
pub trait ChangeBus: Send + Sync {
    /// Publish a single change. Nothing is retried.
    async fn publish(&self, change: UserChange) -> Result<(), DomainError>;

    /// Subscribe to changes matching `filter` until `cancel` fires.
    async fn subscribe(
        &self,
        filter: SubscriptionFilter,
        cancel: CancellationToken,
    ) -> Result<ChangeStream, DomainError>;

    /// Close the broker connection. Safe to call more than once.
    async fn shutdown(&self);
}
