//! Storage layer: `SeaORM` persistence for user records.
//!
//! - `entity.rs` - the `users` table
//! - `mapper.rs` - conversions between rows and SDK models
//! - `migrations/` - schema migrations, applied on connect
//! - `users_sea_repo.rs` - `UsersRepository` implementation

pub mod entity;
pub mod mapper;
pub mod migrations;
pub mod users_sea_repo;

pub use users_sea_repo::OrmUsersRepository;
