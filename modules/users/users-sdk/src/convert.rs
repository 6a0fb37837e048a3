//! Conversions between SDK models and the generated protobuf messages.

use prost_types::{FieldMask, Timestamp};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::ConversionError;
use crate::models::{
    ChangeKind, Paging, SubscriptionFilter, TimeFilter, UpdateUserFields, User, UserChange,
    UserFilter,
};
use crate::proto;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

#[must_use]
pub fn timestamp_from_time(at: OffsetDateTime) -> Timestamp {
    Timestamp {
        seconds: at.unix_timestamp(),
        nanos: i32::try_from(at.nanosecond()).unwrap_or_default(),
    }
}

/// # Errors
/// Returns `ConversionError::InvalidTimestamp` if the timestamp is out of range.
pub fn time_from_timestamp(
    ts: &Timestamp,
    field: &'static str,
) -> Result<OffsetDateTime, ConversionError> {
    let nanos = i128::from(ts.seconds) * NANOS_PER_SECOND + i128::from(ts.nanos);
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|_| ConversionError::InvalidTimestamp { field })
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ConversionError> {
    Uuid::parse_str(value).map_err(|_| ConversionError::invalid_uuid(field, value))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// --- change kinds ---

impl From<ChangeKind> for proto::UserChangeType {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Unknown => proto::UserChangeType::Unknown,
            ChangeKind::Created => proto::UserChangeType::Created,
            ChangeKind::Updated => proto::UserChangeType::Updated,
            ChangeKind::Deleted => proto::UserChangeType::Deleted,
        }
    }
}

impl From<proto::UserChangeType> for ChangeKind {
    fn from(kind: proto::UserChangeType) -> Self {
        match kind {
            proto::UserChangeType::Unknown => ChangeKind::Unknown,
            proto::UserChangeType::Created => ChangeKind::Created,
            proto::UserChangeType::Updated => ChangeKind::Updated,
            proto::UserChangeType::Deleted => ChangeKind::Deleted,
        }
    }
}

impl ChangeKind {
    /// Maps a raw wire value; values outside the enum become `Unknown`.
    #[must_use]
    pub fn from_wire(value: i32) -> Self {
        proto::UserChangeType::try_from(value).map_or(ChangeKind::Unknown, Into::into)
    }
}

// --- users ---

impl From<&User> for proto::User {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            nickname: user.nickname.clone(),
            password: user.password.clone(),
            email: user.email.clone(),
            country: user.country.clone(),
            created_at: Some(timestamp_from_time(user.created_at)),
            updated_at: user.updated_at.map(timestamp_from_time),
        }
    }
}

impl TryFrom<proto::User> for User {
    type Error = ConversionError;

    fn try_from(user: proto::User) -> Result<Self, Self::Error> {
        let id = if user.id.is_empty() {
            Uuid::nil()
        } else {
            parse_uuid("user.id", &user.id)?
        };

        let created_at = match user.created_at {
            Some(ts) => time_from_timestamp(&ts, "user.created_at")?,
            None => OffsetDateTime::UNIX_EPOCH,
        };
        let updated_at = user
            .updated_at
            .map(|ts| time_from_timestamp(&ts, "user.updated_at"))
            .transpose()?;

        Ok(Self {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            nickname: user.nickname,
            email: user.email,
            password: user.password,
            country: user.country,
            created_at,
            updated_at,
        })
    }
}

// --- filters and paging ---

impl TryFrom<proto::TimeFilter> for TimeFilter {
    type Error = ConversionError;

    fn try_from(filter: proto::TimeFilter) -> Result<Self, Self::Error> {
        Ok(Self {
            before: filter
                .before
                .map(|ts| time_from_timestamp(&ts, "before"))
                .transpose()?,
            after: filter
                .after
                .map(|ts| time_from_timestamp(&ts, "after"))
                .transpose()?,
        })
    }
}

impl From<TimeFilter> for proto::TimeFilter {
    fn from(filter: TimeFilter) -> Self {
        Self {
            before: filter.before.map(timestamp_from_time),
            after: filter.after.map(timestamp_from_time),
        }
    }
}

impl TryFrom<proto::SearchFilter> for UserFilter {
    type Error = ConversionError;

    fn try_from(filter: proto::SearchFilter) -> Result<Self, Self::Error> {
        let ids = filter
            .ids
            .iter()
            .map(|id| parse_uuid("ids", id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ids,
            first_name: non_empty(filter.first_name),
            last_name: non_empty(filter.last_name),
            nickname: non_empty(filter.nickname),
            email: non_empty(filter.email),
            countries: filter.countries,
            created: filter.created.map(TryInto::try_into).transpose()?,
            updated: filter.updated.map(TryInto::try_into).transpose()?,
        })
    }
}

impl From<&UserFilter> for proto::SearchFilter {
    fn from(filter: &UserFilter) -> Self {
        Self {
            ids: filter.ids.iter().map(ToString::to_string).collect(),
            first_name: filter.first_name.clone(),
            last_name: filter.last_name.clone(),
            nickname: filter.nickname.clone(),
            email: filter.email.clone(),
            countries: filter.countries.clone(),
            created: filter.created.map(Into::into),
            updated: filter.updated.map(Into::into),
        }
    }
}

impl UserFilter {
    /// Absent filter means "match everything".
    ///
    /// # Errors
    /// Returns an error if an id or timestamp is malformed.
    pub fn from_proto(filter: Option<proto::SearchFilter>) -> Result<Self, ConversionError> {
        filter.map_or_else(|| Ok(Self::default()), TryInto::try_into)
    }
}

impl TryFrom<proto::Paging> for Paging {
    type Error = ConversionError;

    fn try_from(paging: proto::Paging) -> Result<Self, Self::Error> {
        let offset = u64::try_from(paging.offset)
            .map_err(|_| ConversionError::NegativePaging { field: "offset" })?;
        let limit = u64::try_from(paging.limit)
            .map_err(|_| ConversionError::NegativePaging { field: "limit" })?;
        Ok(Self { offset, limit })
    }
}

impl Paging {
    /// Absent paging is offset 0, limit 0 (an empty page).
    ///
    /// # Errors
    /// Returns an error if offset or limit is negative.
    pub fn from_proto(paging: Option<proto::Paging>) -> Result<Self, ConversionError> {
        paging.map_or_else(|| Ok(Self::default()), TryInto::try_into)
    }
}

// --- partial updates ---

impl UpdateUserFields {
    /// Builds a partial update from a field mask and the carrying user message.
    ///
    /// Every listed path becomes a present field; its value (possibly empty,
    /// which clears the field) is taken from `user`. Paths may be prefixed
    /// with `user.`.
    ///
    /// # Errors
    /// Returns `ConversionError::UnknownFieldMaskPath` for paths that do not
    /// name an updatable field.
    pub fn from_field_mask(
        mask: Option<&FieldMask>,
        user: Option<&proto::User>,
    ) -> Result<Self, ConversionError> {
        let mut fields = Self::default();
        let Some(mask) = mask else {
            return Ok(fields);
        };
        let empty = proto::User::default();
        let user = user.unwrap_or(&empty);

        for path in &mask.paths {
            let name = path.strip_prefix("user.").unwrap_or(path);
            let (slot, value) = match name {
                "first_name" => (&mut fields.first_name, &user.first_name),
                "last_name" => (&mut fields.last_name, &user.last_name),
                "nickname" => (&mut fields.nickname, &user.nickname),
                "email" => (&mut fields.email, &user.email),
                "password" => (&mut fields.password, &user.password),
                "country" => (&mut fields.country, &user.country),
                _ => {
                    return Err(ConversionError::UnknownFieldMaskPath { path: path.clone() });
                }
            };
            *slot = Some(value.clone());
        }

        Ok(fields)
    }
}

// --- change notifications ---

impl TryFrom<&UserChange> for proto::SubscriptionResponse {
    type Error = ConversionError;

    fn try_from(change: &UserChange) -> Result<Self, Self::Error> {
        if !change.is_publishable() {
            return Err(ConversionError::NotPublishable);
        }
        Ok(Self {
            update: Some(proto::SubscriptionMessage {
                user_id: change.user_id.to_string(),
                change_type: proto::UserChangeType::from(change.kind).into(),
            }),
        })
    }
}

impl TryFrom<proto::SubscriptionResponse> for UserChange {
    type Error = ConversionError;

    fn try_from(resp: proto::SubscriptionResponse) -> Result<Self, Self::Error> {
        let update = resp
            .update
            .ok_or(ConversionError::MissingField { field: "update" })?;
        Ok(Self {
            user_id: parse_uuid("update.user_id", &update.user_id)?,
            kind: ChangeKind::from_wire(update.change_type),
        })
    }
}

impl TryFrom<proto::SubscriptionRequest> for SubscriptionFilter {
    type Error = ConversionError;

    fn try_from(req: proto::SubscriptionRequest) -> Result<Self, Self::Error> {
        let Some(params) = req.params else {
            return Ok(Self::default());
        };

        let user_id = if params.user_id.is_empty() {
            None
        } else {
            Some(parse_uuid("params.user_id", &params.user_id)?)
        };

        Ok(Self {
            user_id,
            kind: params.change_type.map(ChangeKind::from_wire),
        })
    }
}

impl From<SubscriptionFilter> for proto::SubscriptionRequest {
    fn from(filter: SubscriptionFilter) -> Self {
        Self {
            params: Some(proto::SubscriptionParams {
                user_id: filter.user_id.map(|id| id.to_string()).unwrap_or_default(),
                change_type: filter
                    .kind
                    .map(|kind| proto::UserChangeType::from(kind).into()),
            }),
        }
    }
}
