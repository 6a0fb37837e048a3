use std::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

/// A user record.
///
/// Profile fields are opaque strings; an empty string means "not set".
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
    pub country: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            first_name: String::new(),
            last_name: String::new(),
            nickname: String::new(),
            email: String::new(),
            password: String::new(),
            country: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: None,
        }
    }
}

// Only the id is printed so records never leak PII into logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Kind of change applied to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeKind {
    #[default]
    Unknown,
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 4] = [
        ChangeKind::Unknown,
        ChangeKind::Created,
        ChangeKind::Updated,
        ChangeKind::Deleted,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Unknown => "UNKNOWN",
            ChangeKind::Created => "CREATED",
            ChangeKind::Updated => "UPDATED",
            ChangeKind::Deleted => "DELETED",
        }
    }

    /// Parses a kind name; anything unrecognised maps to `Unknown`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .unwrap_or(ChangeKind::Unknown)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change notification for a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserChange {
    pub user_id: Uuid,
    pub kind: ChangeKind,
}

impl UserChange {
    #[must_use]
    pub fn new(user_id: Uuid, kind: ChangeKind) -> Self {
        Self { user_id, kind }
    }

    /// A change can only be published for a concrete user.
    #[must_use]
    pub fn is_publishable(&self) -> bool {
        !self.user_id.is_nil()
    }
}

/// Narrows a change subscription. Absent fields match everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<Uuid>,
    pub kind: Option<ChangeKind>,
}

/// Open or closed time window, both bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeFilter {
    pub before: Option<OffsetDateTime>,
    pub after: Option<OffsetDateTime>,
}

impl TimeFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}

/// Search criteria for users. Empty criteria match every user.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct UserFilter {
    pub ids: Vec<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub countries: Vec<String>,
    pub created: Option<TimeFilter>,
    pub updated: Option<TimeFilter>,
}

impl UserFilter {
    #[must_use]
    pub fn by_id(id: Uuid) -> Self {
        Self {
            ids: vec![id],
            ..Self::default()
        }
    }
}

impl fmt::Debug for UserFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "REDACTED";
        let redact = |v: &Option<String>| v.as_ref().map(|_| REDACTED);

        f.debug_struct("UserFilter")
            .field("ids", &self.ids)
            .field("first_name", &redact(&self.first_name))
            .field("last_name", &redact(&self.last_name))
            .field("nickname", &redact(&self.nickname))
            .field("email", &redact(&self.email))
            .field("countries", &self.countries)
            .field("created", &self.created)
            .field("updated", &self.updated)
            .finish()
    }
}

/// Offset/limit paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paging {
    pub offset: u64,
    pub limit: u64,
}

/// Partial update of a user.
///
/// Per field: `None` leaves the column untouched, `Some("")` clears it and
/// `Some(value)` sets it.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct UpdateUserFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub country: Option<String>,
}

impl UpdateUserFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.nickname.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.country.is_none()
    }

    /// Names of the fields that will be touched, for logging.
    #[must_use]
    pub fn touched(&self) -> Vec<&'static str> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("nickname", &self.nickname),
            ("email", &self.email),
            ("password", &self.password),
            ("country", &self.country),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|_| name))
        .collect()
    }
}

impl fmt::Debug for UpdateUserFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUserFields")
            .field("touched", &self.touched())
            .finish()
    }
}
