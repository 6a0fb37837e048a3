//! Binary wire format for change notifications.

use bytes::Bytes;
use prost::Message;
use thiserror::Error;
use users_sdk::proto::SubscriptionResponse;
use users_sdk::{ConversionError, UserChange};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// # Errors
/// Fails for changes that are not publishable.
pub fn encode(change: &UserChange) -> Result<Bytes, CodecError> {
    let msg = SubscriptionResponse::try_from(change)?;
    Ok(Bytes::from(msg.encode_to_vec()))
}

/// # Errors
/// Fails on malformed protobuf or an invalid user id.
pub fn decode(payload: &[u8]) -> Result<UserChange, CodecError> {
    let msg = SubscriptionResponse::decode(payload)?;
    Ok(UserChange::try_from(msg)?)
}
