//! gRPC surface of the users service.
//!
//! The server decodes requests with the SDK conversions, delegates to the
//! domain `UsersService` and maps `DomainError` to `tonic::Status` in one
//! place (`error.rs`). Subscriptions are bridged to the outbound stream by
//! `bridge::forward_changes`.

pub mod bridge;
pub mod error;
pub mod server;

pub use server::UsersGrpc;
