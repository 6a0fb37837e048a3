//! Users Module
//!
//! CRUD over user records exposed through the `users.v1.UsersService` gRPC
//! contract, with change notifications fanned out over a message bus.
//!
//! ## Architecture
//!
//! - `domain/` - ports, errors and the orchestrating `UsersService`
//! - `infra/bus/` - topic derivation, wire codec, brokers and the bus client
//! - `infra/storage/` - `SeaORM` repository and migrations
//! - `api/grpc/` - tonic server and the subscription delivery bridge
//! - `module.rs` - wiring and lifecycle
//!
//! Models and the protobuf contract live in the `users-sdk` crate.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// === PUBLIC API (from SDK) ===
pub use users_sdk::{
    ChangeKind, Paging, SubscriptionFilter, UpdateUserFields, User, UserChange, UserFilter,
};

// === MODULE DEFINITION ===
pub mod config;
pub mod module;
pub use config::UsersConfig;
pub use module::UsersModule;

// === INTERNAL MODULES ===
// Exposed for integration tests; external consumers should stick to the SDK.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
