#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use users::User;
use users::domain::{ChangeBus, UsersRepository};
use users::infra::bus::{BusClient, MemoryBroker};
use users::infra::storage::OrmUsersRepository;
use uuid::Uuid;

pub const WAIT: Duration = Duration::from_secs(5);

/// Fixed base instant shifted by whole seconds.
pub fn at(offset_secs: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000 + offset_secs).expect("valid timestamp")
}

pub async fn inmem_repo() -> OrmUsersRepository {
    OrmUsersRepository::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite with migrations")
}

pub fn memory_bus() -> Arc<dyn ChangeBus> {
    Arc::new(BusClient::new(Arc::new(MemoryBroker::new(64))))
}

pub fn user(nickname: &str, country: &str, created_offset_secs: i64) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        nickname: nickname.to_owned(),
        email: format!("{nickname}@example.com"),
        password: "secret".to_owned(),
        country: country.to_owned(),
        created_at: at(created_offset_secs),
        updated_at: None,
    }
}

pub async fn seed(repo: &dyn UsersRepository, users: &[User]) {
    for u in users {
        repo.add(u).await.expect("seed user");
    }
}
