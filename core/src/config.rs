//! Host-supplied settings: default source system, caller identity and the
//! base URI of each entity type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MdmError;

/// Prefix of environment variables naming an entity's base URI,
/// e.g. `MDM_URI_PERSON=http://mdm/api/person`.
pub const ENTITY_URI_ENV_PREFIX: &str = "MDM_URI_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdmConfig {
    /// Stamped on requests whose `RequestInfo` names no source system.
    pub source_system: String,
    /// Sent in the identity header unless the requester is given its own
    /// identity provider.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Base URI per entity type, keyed by lower-cased entity name.
    #[serde(default)]
    pub entity_uris: HashMap<String, String>,
}

impl MdmConfig {
    pub fn new(source_system: impl Into<String>) -> Self {
        Self {
            source_system: source_system.into(),
            ..Self::default()
        }
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_entity_uri(mut self, entity: &str, base_uri: impl Into<String>) -> Self {
        self.entity_uris.insert(entity.to_ascii_lowercase(), base_uri.into());
        self
    }

    pub fn entity_uri(&self, entity: &str) -> Result<&str, MdmError> {
        self.entity_uris
            .get(&entity.to_ascii_lowercase())
            .map(String::as_str)
            .ok_or_else(|| MdmError::MissingEntityUri(entity.to_string()))
    }

    /// Read `MDM_SOURCE_SYSTEM`, `MDM_USER_NAME` and every `MDM_URI_<ENTITY>`.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut config = Self::default();
        for (key, value) in vars {
            match key.as_str() {
                "MDM_SOURCE_SYSTEM" => config.source_system = value,
                "MDM_USER_NAME" => config.user_name = Some(value),
                _ => {
                    if let Some(entity) = key.strip_prefix(ENTITY_URI_ENV_PREFIX) {
                        config.entity_uris.insert(entity.to_ascii_lowercase(), value);
                    }
                }
            }
        }
        config
    }
}
