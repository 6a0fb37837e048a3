use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use users::UsersModule;
use users::api::grpc::UsersGrpc;
use users_sdk::UsersServiceServer;

/// Serve the users service and gRPC health until `cancel` fires.
///
/// Open subscriptions hold child tokens of `cancel`, so they end before the
/// server finishes draining.
///
/// # Errors
/// Fails if the address cannot be bound or the transport fails.
pub async fn serve(addr: SocketAddr, module: &UsersModule, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound_addr = listener.local_addr()?;

    let (reporter, health) = tonic_health::server::health_reporter();
    reporter
        .set_serving::<UsersServiceServer<UsersGrpc>>()
        .await;

    tracing::info!(%bound_addr, "users gRPC server listening");
    Server::builder()
        .add_service(health)
        .add_service(module.grpc_service(cancel.clone()))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::info!("users gRPC server stopped");
    Ok(())
}
