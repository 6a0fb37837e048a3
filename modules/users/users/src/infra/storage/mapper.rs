use sea_orm::Set;
use time::OffsetDateTime;
use users_sdk::User;

use crate::domain::error::DomainError;
use crate::infra::storage::entity::{ActiveModel as UserAM, Model as UserEntity};

/// Stored form of a timestamp: whole nanoseconds since the Unix epoch.
///
/// A fixed-width integer orders the same way on every backend, which text
/// timestamps with trimmed fractions do not.
///
/// # Errors
/// Fails for instants outside roughly 1678 to 2262.
pub fn to_nanos(at: OffsetDateTime) -> Result<i64, DomainError> {
    i64::try_from(at.unix_timestamp_nanos())
        .map_err(|_| DomainError::unknown(format!("timestamp {at} is outside the storable range")))
}

/// Filter bound in stored form. Bounds past the storable range saturate,
/// which keeps the strict comparison against stored values intact.
#[must_use]
pub fn bound_nanos(at: OffsetDateTime) -> i64 {
    let nanos = at.unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(if nanos < 0 { i64::MIN } else { i64::MAX })
}

#[must_use]
pub fn from_nanos(nanos: i64) -> OffsetDateTime {
    // Every i64 nanosecond count lies within `OffsetDateTime`'s range.
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            nickname: e.nickname,
            email: e.email,
            password: e.password,
            country: e.country,
            created_at: from_nanos(e.created_at),
            updated_at: e.updated_at.map(from_nanos),
        }
    }
}

/// Fully populated active model for an insert.
///
/// # Errors
/// Fails if a timestamp cannot be stored.
pub fn to_active_model(user: &User) -> Result<UserAM, DomainError> {
    Ok(UserAM {
        id: Set(user.id),
        first_name: Set(user.first_name.clone()),
        last_name: Set(user.last_name.clone()),
        nickname: Set(user.nickname.clone()),
        email: Set(user.email.clone()),
        password: Set(user.password.clone()),
        country: Set(user.country.clone()),
        created_at: Set(to_nanos(user.created_at)?),
        updated_at: Set(user.updated_at.map(to_nanos).transpose()?),
    })
}
