//! Success classification and the server's fault payload.
//!
//! # Design
//! Whether a response counts as a success is decided by a [`FaultHandler`]
//! strategy handed to the `Requester`, so callers can widen the accepted
//! statuses without touching request code.

use serde::{Deserialize, Serialize};

use crate::status::StatusCode;

/// Error payload returned by the MDM service, or synthesized by the client
/// when the payload is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Fault read from a response body, falling back to the status name.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Fault::new(status.to_string()))
    }
}

/// Decides whether a response status is a success for an operation that
/// expected `expected`.
pub trait FaultHandler: Send + Sync {
    fn handle(&self, status: StatusCode, expected: StatusCode) -> bool;
}

/// Succeeds only on the exact expected status.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFaultHandler;

impl FaultHandler for StandardFaultHandler {
    fn handle(&self, status: StatusCode, expected: StatusCode) -> bool {
        status == expected
    }
}

/// Succeeds on the expected status or any of an extra accepted set.
#[derive(Debug, Clone, Default)]
pub struct AcceptAnyFaultHandler {
    accepted: Vec<StatusCode>,
}

impl AcceptAnyFaultHandler {
    pub fn new(accepted: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
        }
    }
}

impl FaultHandler for AcceptAnyFaultHandler {
    fn handle(&self, status: StatusCode, expected: StatusCode) -> bool {
        status == expected || self.accepted.contains(&status)
    }
}
