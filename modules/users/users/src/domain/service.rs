//! Domain service for users
//!
//! Every mutation is a two-phase sequence: the durable write through the
//! repository, then a best-effort change notification on the bus. A failed
//! notification never fails the mutation.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use users_sdk::{
    ChangeKind, Paging, SubscriptionFilter, UpdateUserFields, User, UserChange, UserFilter,
};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::ports::{ChangeBus, ChangeStream, UsersRepository};

#[derive(Clone)]
pub struct UsersService {
    repo: Arc<dyn UsersRepository>,
    bus: Arc<dyn ChangeBus>,
}

impl UsersService {
    pub fn new(repo: Arc<dyn UsersRepository>, bus: Arc<dyn ChangeBus>) -> Self {
        Self { repo, bus }
    }

    /// Create a user, generating an id when none was supplied.
    ///
    /// `created_at` is stamped here and `updated_at` is always reset.
    ///
    /// # Errors
    /// Propagates repository failures; nothing is published in that case.
    pub async fn add(&self, mut user: User) -> Result<User, DomainError> {
        user.created_at = OffsetDateTime::now_utc();
        user.updated_at = None;
        if user.id.is_nil() {
            user.id = Uuid::new_v4();
        }

        self.repo.add(&user).await?;
        tracing::info!(user_id = %user.id, "user created");

        self.publish_best_effort(UserChange::new(user.id, ChangeKind::Created))
            .await;
        Ok(user)
    }

    /// # Errors
    /// `NotFound` when no user matches `filter`, or any repository failure.
    pub async fn update_partial(
        &self,
        filter: &UserFilter,
        fields: &UpdateUserFields,
    ) -> Result<User, DomainError> {
        let user = self.repo.update_partial(filter, fields).await?;
        tracing::info!(user_id = %user.id, touched = ?fields.touched(), "user updated");

        self.publish_best_effort(UserChange::new(user.id, ChangeKind::Updated))
            .await;
        Ok(user)
    }

    /// # Errors
    /// `InvalidUserId` for the nil id (the repository is not consulted), or
    /// any repository failure.
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if id.is_nil() {
            return Err(DomainError::InvalidUserId);
        }

        self.repo.delete(id).await?;
        tracing::info!(user_id = %id, "user deleted");

        self.publish_best_effort(UserChange::new(id, ChangeKind::Deleted))
            .await;
        Ok(())
    }

    /// A zero `limit` short-circuits to an empty page without touching storage.
    ///
    /// # Errors
    /// Propagates repository failures.
    pub async fn list(
        &self,
        filter: &UserFilter,
        paging: Paging,
    ) -> Result<(Vec<User>, u64), DomainError> {
        if paging.limit == 0 {
            return Ok((Vec::new(), 0));
        }
        self.repo.list(filter, paging).await
    }

    /// # Errors
    /// `InvalidUserId` for a filter naming the nil id, or a broker failure.
    pub async fn subscribe_to_user_changes(
        &self,
        filter: SubscriptionFilter,
        cancel: CancellationToken,
    ) -> Result<ChangeStream, DomainError> {
        self.bus.subscribe(filter, cancel).await
    }

    async fn publish_best_effort(&self, change: UserChange) {
        if let Err(e) = self.bus.publish(change).await {
            tracing::warn!(
                error = %e,
                user_id = %change.user_id,
                kind = %change.kind,
                "failed to publish user change"
            );
        }
    }
}
