//! Users SDK
//!
//! This crate provides everything needed to talk to the users service:
//! - Transport-agnostic models (`User`, `UserChange`, `UserFilter`, ...)
//! - Conversion errors (`ConversionError`)
//! - Proto stubs and the conversions between them and the models
//!
//! ## Usage
//!
//! ```ignore
//! use users_sdk::proto::users_service_client::UsersServiceClient;
//! use users_sdk::proto::SubscriptionRequest;
//!
//! let mut client = UsersServiceClient::connect("http://127.0.0.1:8000").await?;
//! let mut changes = client
//!     .subscribe(SubscriptionRequest::default())
//!     .await?
//!     .into_inner();
//! while let Some(change) = changes.message().await? {
//!     println!("{change:?}");
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

// === MODELS AND ERRORS ===
mod errors;
mod models;
pub use errors::ConversionError;
pub use models::{
    ChangeKind, Paging, SubscriptionFilter, TimeFilter, UpdateUserFields, User, UserChange,
    UserFilter,
};

// === PROTO CONVERSIONS ===
mod convert;
pub use convert::{timestamp_from_time, time_from_timestamp};

// === GRPC PROTO STUBS ===
/// Generated protobuf types for `UsersService`
#[allow(clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("users.v1");
}

pub use proto::users_service_server::{UsersService, UsersServiceServer};

/// Fully qualified gRPC service name, used for health reporting.
pub const SERVICE_NAME: &str = "users.v1.UsersService";
