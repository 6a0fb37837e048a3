//! Users module wiring and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use users_sdk::UsersServiceServer;

use crate::api::grpc::UsersGrpc;
use crate::config::{BusKind, UsersConfig};
use crate::domain::{ChangeBus, UsersRepository, UsersService};
use crate::infra::bus::{Broker, BusClient, MemoryBroker, NatsBroker};
use crate::infra::storage::OrmUsersRepository;

/// Users module: owns the repository, the bus client and the domain service.
pub struct UsersModule {
    repo: Arc<dyn UsersRepository>,
    bus: Arc<dyn ChangeBus>,
    service: Arc<UsersService>,
}

impl UsersModule {
    /// Connect storage (running migrations) and the broker.
    ///
    /// # Errors
    /// Fails if either the database or the broker is unreachable.
    pub async fn init(cfg: &UsersConfig) -> Result<Self> {
        tracing::info!("Initializing users module");

        let repo = OrmUsersRepository::connect(&cfg.database.dsn, cfg.database.max_connections)
            .await
            .context("failed to open users storage")?;

        let broker: Arc<dyn Broker> = match cfg.bus.kind {
            BusKind::Nats => Arc::new(
                NatsBroker::connect(&cfg.bus.url)
                    .await
                    .context("failed to connect to message bus")?,
            ),
            BusKind::Memory => Arc::new(MemoryBroker::new(cfg.bus.memory_capacity)),
        };

        let module = Self::from_parts(Arc::new(repo), Arc::new(BusClient::new(broker)));
        tracing::info!(bus = ?cfg.bus.kind, "users module initialized");
        Ok(module)
    }

    pub fn from_parts(repo: Arc<dyn UsersRepository>, bus: Arc<dyn ChangeBus>) -> Self {
        let service = Arc::new(UsersService::new(repo.clone(), bus.clone()));
        Self { repo, bus, service }
    }

    #[must_use]
    pub fn service(&self) -> Arc<UsersService> {
        self.service.clone()
    }

    /// The tonic service; its subscriptions end when `shutdown` is cancelled.
    #[must_use]
    pub fn grpc_service(&self, shutdown: CancellationToken) -> UsersServiceServer<UsersGrpc> {
        UsersServiceServer::new(UsersGrpc::new(self.service.clone(), shutdown))
    }

    /// Release resources in reverse creation order: bus first, then storage.
    ///
    /// # Errors
    /// Fails if the storage connection cannot be closed cleanly.
    pub async fn shutdown(&self) -> Result<()> {
        self.bus.shutdown().await;
        tracing::info!("users bus closed");

        self.repo
            .shutdown()
            .await
            .context("failed to close users storage")?;
        tracing::info!("users storage closed");
        Ok(())
    }
}
