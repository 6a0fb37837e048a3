use thiserror::Error;

/// Errors raised while converting wire messages into SDK models.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("invalid uuid in '{field}': '{value}'")]
    InvalidUuid { field: &'static str, value: String },

    #[error("invalid timestamp in '{field}'")]
    InvalidTimestamp { field: &'static str },

    #[error("'{field}' must not be negative")]
    NegativePaging { field: &'static str },

    #[error("unknown field mask path: '{path}'")]
    UnknownFieldMaskPath { path: String },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("change for nil user id cannot be published")]
    NotPublishable,
}

impl ConversionError {
    pub fn invalid_uuid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidUuid {
            field,
            value: value.into(),
        }
    }

    /// Whether the error is caused by a malformed user id.
    #[must_use]
    pub fn is_invalid_uuid(&self) -> bool {
        matches!(self, Self::InvalidUuid { .. })
    }
}
