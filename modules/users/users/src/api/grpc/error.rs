use tonic::Status;
use users_sdk::ConversionError;

use crate::domain::DomainError;

impl From<DomainError> for Status {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidUserId | DomainError::DuplicateUserId => {
                Status::invalid_argument(e.to_string())
            }
            DomainError::NotFound => Status::not_found(e.to_string()),
            DomainError::Unknown { source } => {
                tracing::warn!(error = %source, "request failed with an internal error");
                Status::internal("internal error")
            }
        }
    }
}

/// Malformed request payloads are always the caller's fault.
pub fn invalid_argument(e: ConversionError) -> Status {
    Status::invalid_argument(e.to_string())
}
