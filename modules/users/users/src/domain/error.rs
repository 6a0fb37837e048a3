use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid user id")]
    InvalidUserId,

    #[error("duplicate user id")]
    DuplicateUserId,

    #[error("not found")]
    NotFound,

    #[error("unknown error: {source}")]
    Unknown {
        #[source]
        source: BoxError,
    },
}

impl DomainError {
    pub fn unknown(source: impl Into<BoxError>) -> Self {
        Self::Unknown {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    #[must_use]
    pub fn is_invalid_user_id(&self) -> bool {
        matches!(self, Self::InvalidUserId)
    }
}
