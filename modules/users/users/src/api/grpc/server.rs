//! gRPC server implementation for the users service.
//!
//! Handlers decode requests, delegate to the domain `UsersService` and encode
//! the result. Each call runs in its own span with a fresh `request_id`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::Instrument;
use users_sdk::proto::users_service_server::UsersService as UsersServiceApi;
use users_sdk::proto::{
    AddUserRequest, AddUserResponse, DeleteUserRequest, DeleteUserResponse, ListUsersRequest,
    ListUsersResponse, PagingMetadata, SubscriptionRequest, SubscriptionResponse,
    UpdateUserRequest, UpdateUserResponse,
};
use users_sdk::{ConversionError, Paging, SubscriptionFilter, UpdateUserFields, User, UserFilter};
use uuid::Uuid;

use super::bridge;
use super::error::invalid_argument;
use crate::domain::UsersService;

const OUTBOUND_BUFFER: usize = 16;

/// gRPC service implementation that wraps the domain `UsersService`.
#[derive(Clone)]
pub struct UsersGrpc {
    service: Arc<UsersService>,
    shutdown: CancellationToken,
}

impl UsersGrpc {
    /// Open subscriptions end cleanly once `shutdown` is cancelled.
    pub fn new(service: Arc<UsersService>, shutdown: CancellationToken) -> Self {
        Self { service, shutdown }
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid, ConversionError> {
    if raw.is_empty() {
        return Ok(Uuid::nil());
    }
    Uuid::parse_str(raw).map_err(|_| ConversionError::invalid_uuid("id", raw))
}

#[tonic::async_trait]
impl UsersServiceApi for UsersGrpc {
    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), endpoint = "Add"))]
    async fn add(
        &self,
        request: Request<AddUserRequest>,
    ) -> Result<Response<AddUserResponse>, Status> {
        let user = request
            .into_inner()
            .user
            .map(User::try_from)
            .transpose()
            .map_err(invalid_argument)?
            .unwrap_or_default();

        let user = self.service.add(user).await?;
        Ok(Response::new(AddUserResponse {
            user: Some((&user).into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), endpoint = "Update"))]
    async fn update(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<UpdateUserResponse>, Status> {
        let req = request.into_inner();
        let fields = UpdateUserFields::from_field_mask(req.update_mask.as_ref(), req.user.as_ref())
            .map_err(invalid_argument)?;
        let filter = UserFilter::from_proto(req.filter).map_err(invalid_argument)?;
        tracing::debug!(?filter, ?fields, "update requested");

        let user = self.service.update_partial(&filter, &fields).await?;
        Ok(Response::new(UpdateUserResponse {
            user: Some((&user).into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), endpoint = "Delete"))]
    async fn delete(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> Result<Response<DeleteUserResponse>, Status> {
        let id = parse_user_id(&request.into_inner().id).map_err(invalid_argument)?;

        self.service.delete(id).await?;
        Ok(Response::new(DeleteUserResponse {}))
    }

    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), endpoint = "List"))]
    async fn list(
        &self,
        request: Request<ListUsersRequest>,
    ) -> Result<Response<ListUsersResponse>, Status> {
        let req = request.into_inner();
        let filter = UserFilter::from_proto(req.filters).map_err(invalid_argument)?;
        let paging = Paging::from_proto(req.paging).map_err(invalid_argument)?;

        let (users, count) = self.service.list(&filter, paging).await?;
        tracing::debug!(returned = users.len(), count, "list served");

        Ok(Response::new(ListUsersResponse {
            users: users.iter().map(Into::into).collect(),
            paging: Some(PagingMetadata { count }),
        }))
    }

    type SubscribeStream = ReceiverStream<Result<SubscriptionResponse, Status>>;

    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), endpoint = "Subscribe"))]
    async fn subscribe(
        &self,
        request: Request<SubscriptionRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let filter = SubscriptionFilter::try_from(request.into_inner()).map_err(invalid_argument)?;

        let cancel = self.shutdown.child_token();
        let changes = self
            .service
            .subscribe_to_user_changes(filter, cancel.clone())
            .await?;
        tracing::info!(user_id = ?filter.user_id, kind = ?filter.kind, "subscription opened");

        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        tokio::spawn(
            async move {
                // Stops the bus delivery loop however the bridge ends.
                let _guard = cancel.clone().drop_guard();
                match bridge::forward_changes(changes, &tx, cancel).await {
                    Ok(()) => tracing::info!("subscription closed"),
                    Err(status) => {
                        tracing::warn!(reason = status.message(), "subscription aborted");
                        let _ = tx.send(Err(status)).await;
                    }
                }
            }
            .instrument(tracing::Span::current()),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
