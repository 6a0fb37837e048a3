use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, Set, SqlErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use time::OffsetDateTime;
use users_sdk::{Paging, TimeFilter, UpdateUserFields, User, UserFilter};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::ports::UsersRepository;
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};
use crate::infra::storage::mapper::{bound_nanos, to_active_model, to_nanos};
use crate::infra::storage::migrations::Migrator;

fn db_err(e: DbErr) -> DomainError {
    DomainError::unknown(e)
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// ORM-based implementation of the `UsersRepository` trait.
#[derive(Clone)]
pub struct OrmUsersRepository {
    db: DatabaseConnection,
}

impl OrmUsersRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a pool for `dsn` and bring the schema up to date.
    ///
    /// In-memory `SQLite` databases are private to a connection, so their
    /// pool is pinned to a single one.
    ///
    /// # Errors
    /// Fails if the database is unreachable or a migration fails.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, DbErr> {
        let mut opts = ConnectOptions::new(dsn.to_owned());
        opts.sqlx_logging(false);
        if is_memory_dsn(dsn) {
            opts.max_connections(1).min_connections(1);
        } else {
            opts.max_connections(max_connections.max(1));
        }

        let db = Database::connect(opts).await?;
        Migrator::up(&db, None).await?;
        tracing::info!(backend = ?db.get_database_backend(), "users storage ready");
        Ok(Self::new(db))
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn time_window(col: Column, window: Option<&TimeFilter>) -> Condition {
    let mut cond = Condition::all();
    if let Some(window) = window {
        if let Some(before) = window.before {
            cond = cond.add(col.lt(bound_nanos(before)));
        }
        if let Some(after) = window.after {
            cond = cond.add(col.gt(bound_nanos(after)));
        }
    }
    cond
}

/// Every present criterion must hold. Empty criteria match all rows.
fn condition(filter: &UserFilter) -> Condition {
    let mut cond = Condition::all();

    if !filter.ids.is_empty() {
        cond = cond.add(Column::Id.is_in(filter.ids.iter().copied()));
    }
    for (col, value) in [
        (Column::FirstName, &filter.first_name),
        (Column::LastName, &filter.last_name),
        (Column::Nickname, &filter.nickname),
        (Column::Email, &filter.email),
    ] {
        if let Some(value) = value {
            cond = cond.add(col.eq(value.as_str()));
        }
    }
    if !filter.countries.is_empty() {
        cond = cond.add(Column::Country.is_in(filter.countries.iter().map(String::as_str)));
    }

    cond.add(time_window(Column::CreatedAt, filter.created.as_ref()))
        .add(time_window(Column::UpdatedAt, filter.updated.as_ref()))
}

/// Insertion order: creation time, then id as a stable tie-breaker.
fn in_insertion_order(select: Select<UserEntity>) -> Select<UserEntity> {
    select
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
}

fn apply_fields(am: &mut UserAM, fields: &UpdateUserFields) {
    if let Some(v) = &fields.first_name {
        am.first_name = Set(v.clone());
    }
    if let Some(v) = &fields.last_name {
        am.last_name = Set(v.clone());
    }
    if let Some(v) = &fields.nickname {
        am.nickname = Set(v.clone());
    }
    if let Some(v) = &fields.email {
        am.email = Set(v.clone());
    }
    if let Some(v) = &fields.password {
        am.password = Set(v.clone());
    }
    if let Some(v) = &fields.country {
        am.country = Set(v.clone());
    }
}

#[async_trait]
impl UsersRepository for OrmUsersRepository {
    async fn add(&self, user: &User) -> Result<(), DomainError> {
        match to_active_model(user)?.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(DomainError::DuplicateUserId)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn update_partial(
        &self,
        filter: &UserFilter,
        fields: &UpdateUserFields,
    ) -> Result<User, DomainError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let Some(found) = in_insertion_order(UserEntity::find().filter(condition(filter)))
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            return Err(DomainError::NotFound);
        };

        let mut am: UserAM = found.into();
        apply_fields(&mut am, fields);
        am.updated_at = Set(Some(to_nanos(OffsetDateTime::now_utc())?));

        let updated = am.update(&txn).await.map_err(|e| match e {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => DomainError::NotFound,
            other => db_err(other),
        })?;
        txn.commit().await.map_err(db_err)?;

        Ok(updated.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = UserEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            tracing::debug!(user_id = %id, "delete matched no user");
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &UserFilter,
        paging: Paging,
    ) -> Result<(Vec<User>, u64), DomainError> {
        let query = UserEntity::find().filter(condition(filter));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = in_insertion_order(query)
            .offset(paging.offset)
            .limit(paging.limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn shutdown(&self) -> Result<(), DomainError> {
        self.db.clone().close().await.map_err(db_err)
    }
}
