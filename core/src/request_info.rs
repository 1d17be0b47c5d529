//! Correlation metadata sent with every mutating call.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MdmError;

/// Identifies a logical request and the system it originated from.
///
/// Blank fields are filled in by [`RequestInfo::populated`] before the
/// header is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub source_system: String,
}

impl RequestInfo {
    pub fn new(request_id: impl Into<String>, source_system: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            source_system: source_system.into(),
        }
    }

    /// Fill a fresh request id and the default source system where blank.
    pub fn populated(mut self, default_source_system: &str) -> Self {
        if self.request_id.trim().is_empty() {
            self.request_id = Uuid::new_v4().to_string();
        }
        if self.source_system.trim().is_empty() {
            self.source_system = default_source_system.to_string();
        }
        self
    }

    /// Header value: base64 of the JSON form.
    pub fn encode(&self) -> Result<String, MdmError> {
        let json = serde_json::to_vec(self).map_err(|e| MdmError::Serialization(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(header: &str) -> Result<Self, MdmError> {
        let bytes = STANDARD
            .decode(header.trim())
            .map_err(|e| MdmError::InvalidRequestInfo(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| MdmError::InvalidRequestInfo(e.to_string()))
    }
}
