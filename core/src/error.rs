//! Error types for the MDM client.
//!
//! # Design
//! Only caller mistakes surface as `Err`: an absent or malformed identifier,
//! an update with no concurrency token to send, or an entity type with no
//! configured base URI. Every network or server outcome, including transport
//! and (de)serialization failures, is folded into a `Response` envelope by
//! the `Requester`; the remaining variants exist to carry those failures to
//! that boundary.

use thiserror::Error;

use crate::http::TransportError;
use crate::types::EntityId;

#[derive(Debug, Error)]
pub enum MdmError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid native identifier: {0}")]
    InvalidIdentifier(String),

    #[error("no concurrency token available for entity {0}")]
    MissingConcurrencyToken(EntityId),

    #[error("no base uri configured for entity type {0}")]
    MissingEntityUri(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("invalid uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid request info header: {0}")]
    InvalidRequestInfo(String),
}
