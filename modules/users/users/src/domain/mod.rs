//! Domain layer.
//!
//! The domain layer:
//! - **MAY** import: `users_sdk` (models)
//! - **MUST NOT** import: `api::*` or `infra::*`; infrastructure is reached through `ports`

pub mod error;
pub mod ports;
pub mod service;

pub use error::DomainError;
pub use ports::{ChangeBus, ChangeStream, UsersRepository};
pub use service::UsersService;
