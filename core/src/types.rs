//! Wire contracts shared by every entity type.
//!
//! # Design
//! Entity contracts themselves are defined by the host; the client only
//! needs to read their identifiers and validity start through [`MdmEntity`].
//! Mapping and identifier contracts are common to all entity types and live
//! here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical numeric id of an entity.
pub type EntityId = i64;

/// An identifier of an entity in some system, native or foreign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdmId {
    pub system_name: String,
    pub identifier: String,
    #[serde(default)]
    pub is_mdm_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_reverse_ind: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<i64>,
}

impl MdmId {
    /// A foreign-system identifier.
    pub fn new(system_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// The MDM service's own identifier for an entity.
    pub fn native(system_name: impl Into<String>, id: EntityId) -> Self {
        Self {
            is_mdm_id: true,
            ..Self::new(system_name, id.to_string())
        }
    }
}

impl fmt::Display for MdmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.system_name, self.identifier)
    }
}

/// Payload posted to create a mapping between an entity and a foreign id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub system_name: String,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_reverse_ind: Option<bool>,
}

impl From<&MdmId> for Mapping {
    fn from(id: &MdmId) -> Self {
        Self {
            system_name: id.system_name.clone(),
            identifier: id.identifier.clone(),
            default_reverse_ind: id.default_reverse_ind,
        }
    }
}

/// Mappings returned by mapping creation and cross-mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResponse {
    #[serde(default)]
    pub mappings: Vec<MdmId>,
}

/// Validity window the service keeps for each entity version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// What the client needs to know about an entity contract.
pub trait MdmEntity {
    fn identifiers(&self) -> &[MdmId];

    /// Start of the validity window the contract describes, if any.
    fn start_date(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// The entity's own id: its first native identifier that is numeric.
    fn mdm_key(&self) -> Option<EntityId> {
        self.identifiers()
            .iter()
            .filter(|id| id.is_mdm_id)
            .find_map(|id| id.identifier.trim().parse().ok())
    }
}
