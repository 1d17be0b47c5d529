//! Per-entity-type façade over the `Requester`.
//!
//! # Design
//! An `EntityService<T>` knows the URI layout of one entity collection and
//! composes requester calls into workflows: create then fetch the created
//! resource, update then re-fetch it, create a mapping then fetch it, and
//! resolve identifiers across systems. It remembers the last concurrency
//! token seen for each entity so updates can be made conditional without an
//! extra round-trip; that cache is the only mutable state and is safe to
//! share across threads.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::ConcurrencyTokenCache;
use crate::config::MdmConfig;
use crate::error::MdmError;
use crate::fault::Fault;
use crate::request_info::RequestInfo;
use crate::requester::Requester;
use crate::response::{PagedResponse, Response};
use crate::search::Search;
use crate::status::StatusCode;
use crate::types::{EntityId, Mapping, MappingResponse, MdmEntity, MdmId};

/// Source system whose identifiers are the MDM service's own ids.
pub const DEFAULT_CANONICAL_SYSTEM: &str = "Nexus";

pub const AS_OF_PARAM: &str = "as-of";
pub const SOURCE_SYSTEM_PARAM: &str = "source-system";
pub const MAPPING_VALUE_PARAM: &str = "mapping-value";
pub const DESTINATION_SYSTEM_PARAM: &str = "destination-system";

/// URI layout of one entity collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityUris {
    base: String,
}

impl EntityUris {
    pub fn new(base_uri: &str) -> Self {
        Self {
            base: base_uri.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn entity(&self, id: EntityId) -> String {
        format!("{}/{id}", self.base)
    }

    pub fn entity_list(&self, id: EntityId) -> String {
        format!("{}/{id}/list", self.base)
    }

    pub fn mappings(&self, id: EntityId) -> String {
        format!("{}/{id}/mapping", self.base)
    }

    pub fn mapping(&self, id: EntityId, mapping_id: i64) -> String {
        format!("{}/{id}/mapping/{mapping_id}", self.base)
    }

    pub fn map(&self, source_system: &str, value: &str) -> String {
        format!(
            "{}/map?{SOURCE_SYSTEM_PARAM}={}&{MAPPING_VALUE_PARAM}={}",
            self.base,
            encode_query(source_system),
            encode_query(value)
        )
    }

    pub fn cross_map(&self, source_system: &str, value: &str, target_system: &str) -> String {
        format!(
            "{}/crossmap?{SOURCE_SYSTEM_PARAM}={}&{MAPPING_VALUE_PARAM}={}&{DESTINATION_SYSTEM_PARAM}={}",
            self.base,
            encode_query(source_system),
            encode_query(value),
            encode_query(target_system)
        )
    }

    pub fn search(&self) -> String {
        format!("{}/search", self.base)
    }
}

/// `yyyy-MM-ddTHH:mm:ss.fffffffZ`: UTC with seven fractional digits.
pub fn format_as_of(at: DateTime<Utc>) -> String {
    let ticks = (at.timestamp_subsec_nanos() / 100).min(9_999_999);
    format!("{}.{ticks:07}Z", at.format("%Y-%m-%dT%H:%M:%S"))
}

/// Append `key=value` to `uri`, starting the query string if there is none.
pub fn append_query(uri: &str, key: &str, value: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}{key}={value}")
}

fn with_valid_at(uri: String, valid_at: Option<DateTime<Utc>>) -> String {
    match valid_at {
        Some(at) => append_query(&uri, AS_OF_PARAM, &format_as_of(at)),
        None => uri,
    }
}

fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub struct EntityService<T> {
    requester: Arc<Requester>,
    uris: EntityUris,
    tokens: ConcurrencyTokenCache,
    canonical_system: String,
    entity_name: &'static str,
    _contract: PhantomData<fn() -> T>,
}

impl<T> EntityService<T>
where
    T: MdmEntity + Serialize + DeserializeOwned,
{
    pub fn new(base_uri: &str, requester: Arc<Requester>) -> Self {
        let type_name = std::any::type_name::<T>();
        Self {
            requester,
            uris: EntityUris::new(base_uri),
            tokens: ConcurrencyTokenCache::new(),
            canonical_system: DEFAULT_CANONICAL_SYSTEM.to_string(),
            entity_name: type_name.rsplit("::").next().unwrap_or(type_name),
            _contract: PhantomData,
        }
    }

    /// Service for `entity`, whose base URI is looked up in `config`.
    pub fn from_config(requester: Arc<Requester>, config: &MdmConfig, entity: &str) -> Result<Self, MdmError> {
        Ok(Self::new(config.entity_uri(entity)?, requester))
    }

    /// Treat identifiers from `system` as native ids.
    pub fn with_canonical_system(mut self, system: impl Into<String>) -> Self {
        self.canonical_system = system.into();
        self
    }

    pub fn uris(&self) -> &EntityUris {
        &self.uris
    }

    /// The cached concurrency token for `id`, if any.
    pub fn concurrency_token(&self, id: EntityId) -> Option<String> {
        self.tokens.get(id)
    }

    /// Fetch entity `id`, optionally as it was at `valid_at`.
    pub fn get(&self, id: EntityId, valid_at: Option<DateTime<Utc>>) -> Response<T> {
        debug!(entity = self.entity_name, id, ?valid_at, "Start: EntityService::get");
        let uri = with_valid_at(self.uris.entity(id), valid_at);
        let response = self.fetch(&uri);
        response.log("EntityService::get");
        debug!(entity = self.entity_name, id, "Finish: EntityService::get");
        response
    }

    /// Fetch an entity by any of its identifiers.
    ///
    /// Native identifiers, and identifiers from the canonical system, must be
    /// numeric and are fetched directly; anything else is resolved through
    /// the mapping endpoint.
    pub fn get_by_identifier(
        &self,
        identifier: &MdmId,
        valid_at: Option<DateTime<Utc>>,
    ) -> Result<Response<T>, MdmError> {
        debug!(entity = self.entity_name, %identifier, ?valid_at, "Start: EntityService::get_by_identifier");
        if identifier.identifier.trim().is_empty() {
            return Err(MdmError::InvalidArgument(format!(
                "identifier value is empty for system '{}'",
                identifier.system_name
            )));
        }

        if identifier.is_mdm_id || identifier.system_name == self.canonical_system {
            let id = identifier
                .identifier
                .trim()
                .parse::<EntityId>()
                .map_err(|_| MdmError::InvalidIdentifier(identifier.to_string()))?;
            return Ok(self.get(id, valid_at));
        }

        if identifier.system_name.trim().is_empty() {
            return Err(MdmError::InvalidArgument(format!(
                "identifier '{}' names no source system",
                identifier.identifier
            )));
        }

        let uri = with_valid_at(
            self.uris.map(&identifier.system_name, &identifier.identifier),
            valid_at,
        );
        let response = self.fetch(&uri);
        response.log("EntityService::get_by_identifier");
        debug!(entity = self.entity_name, %identifier, "Finish: EntityService::get_by_identifier");
        Ok(response)
    }

    /// Fetch every version of entity `id`. Tokens are not cached for lists.
    pub fn get_list(&self, id: EntityId) -> Response<Vec<T>> {
        debug!(entity = self.entity_name, id, "EntityService::get_list");
        let response: Response<Vec<T>> = self.requester.get(&self.uris.entity_list(id));
        response.log("EntityService::get_list");
        response
    }

    /// Create an entity and return the server's representation of it.
    ///
    /// The envelope comes from fetching the created resource but carries the
    /// request id of the create call.
    pub fn create(&self, contract: &T, request_info: Option<RequestInfo>) -> Response<T> {
        debug!(entity = self.entity_name, "Start: EntityService::create");
        let response: Response<T> = self.create_then_fetch(self.uris.base(), contract, request_info);
        if response.is_valid {
            self.remember(&response);
        }
        response.log("EntityService::create");
        debug!(entity = self.entity_name, request_id = response.request_id.as_deref(), "Finish: EntityService::create");
        response
    }

    /// Conditionally update entity `id` and return its refreshed state.
    ///
    /// Without an explicit `concurrency_token` the cached one is used; if
    /// there is none the update is refused before anything is sent.
    pub fn update(
        &self,
        id: EntityId,
        contract: &T,
        concurrency_token: Option<&str>,
        request_info: Option<RequestInfo>,
    ) -> Result<Response<T>, MdmError> {
        debug!(entity = self.entity_name, id, "Start: EntityService::update");
        let token = match concurrency_token {
            Some(token) => token.to_string(),
            None => self
                .tokens
                .get(id)
                .ok_or(MdmError::MissingConcurrencyToken(id))?,
        };

        let uri = self.uris.entity(id);
        let updated: Response<T> = self.requester.update(&uri, &token, contract, request_info);
        updated.log("EntityService::update");
        if !updated.is_valid {
            return Ok(updated);
        }

        let location = with_valid_at(updated.location.clone().unwrap_or(uri), contract.start_date());
        debug!(entity = self.entity_name, id, location = %location, "updated; fetching refreshed entity");
        let refreshed = self
            .requester
            .get::<T>(&location)
            .with_request_id(updated.request_id);
        if refreshed.is_valid {
            self.remember(&refreshed);
        }
        refreshed.log("EntityService::update");
        debug!(entity = self.entity_name, id, "Finish: EntityService::update");
        Ok(refreshed)
    }

    /// Map entity `id` to `identifier` and return the stored mapping.
    pub fn create_mapping(
        &self,
        id: EntityId,
        identifier: &MdmId,
        request_info: Option<RequestInfo>,
    ) -> Response<MdmId> {
        debug!(entity = self.entity_name, id, %identifier, "Start: EntityService::create_mapping");
        let mapping = Mapping::from(identifier);
        let created: Response<MappingResponse> =
            self.create_then_fetch(&self.uris.mappings(id), &mapping, request_info);

        let response = if created.is_valid {
            let request_id = created.request_id.clone();
            match created.message.and_then(|body| body.mappings.into_iter().next()) {
                Some(first) => Response::ok(first).with_request_id(request_id),
                None => Response::internal_error("mapping response contained no mappings")
                    .with_request_id(request_id),
            }
        } else {
            created.into_content_free()
        };
        response.log("EntityService::create_mapping");
        debug!(entity = self.entity_name, id, "Finish: EntityService::create_mapping");
        response
    }

    /// Remove mapping `mapping_id` from entity `entity_id`.
    pub fn delete_mapping(
        &self,
        entity_id: EntityId,
        mapping_id: i64,
        request_info: Option<RequestInfo>,
    ) -> Response<T> {
        let uri = self.uris.mapping(entity_id, mapping_id);
        debug!(entity = self.entity_name, uri = %uri, "Start: EntityService::delete_mapping");
        let deleted: Response<T> = self.requester.delete(&uri, request_info);
        let response = if deleted.is_valid {
            Response::success(StatusCode::Ok).with_request_id(deleted.request_id)
        } else {
            deleted.into_content_free()
        };
        response.log("EntityService::delete_mapping");
        debug!(entity = self.entity_name, uri = %uri, "Finish: EntityService::delete_mapping");
        response
    }

    /// First identifier of entity `id` accepted by `predicate`.
    ///
    /// `NotFound` when the entity cannot be fetched (keeping the fetch's
    /// fault) or when no identifier matches.
    pub fn get_mapping(&self, id: EntityId, predicate: impl Fn(&MdmId) -> bool) -> Response<MdmId> {
        debug!(entity = self.entity_name, id, "Start: EntityService::get_mapping");
        let entity = self.get(id, None);
        let response = if entity.is_valid {
            let found = entity
                .message
                .as_ref()
                .and_then(|contract| contract.identifiers().iter().find(|candidate| predicate(*candidate)))
                .cloned();
            match found {
                Some(identifier) => Response::ok(identifier),
                None => Response::failure(
                    StatusCode::NotFound,
                    Fault::new(format!("{} {id} has no matching mapping", self.entity_name)),
                ),
            }
        } else {
            let fault = entity
                .fault
                .unwrap_or_else(|| Fault::new(entity.status.to_string()));
            Response::failure(StatusCode::NotFound, fault)
        };
        response.log("EntityService::get_mapping");
        debug!(entity = self.entity_name, id, "Finish: EntityService::get_mapping");
        response
    }

    /// Identifier of entity `id` in `target_system`, compared case-insensitively.
    pub fn map(&self, id: EntityId, target_system: &str) -> Response<MdmId> {
        let target = target_system.to_lowercase();
        self.get_mapping(id, |candidate| candidate.system_name.to_lowercase() == target)
    }

    /// Translate `value` from `source_system` into `target_system`.
    pub fn cross_map(&self, source_system: &str, value: &str, target_system: &str) -> Response<MappingResponse> {
        debug!(entity = self.entity_name, source_system, value, target_system, "EntityService::cross_map");
        let response: Response<MappingResponse> = self
            .requester
            .get(&self.uris.cross_map(source_system, value, target_system));
        response.log("EntityService::cross_map");
        response
    }

    pub fn cross_map_identifier(
        &self,
        identifier: &MdmId,
        target_system: &str,
    ) -> Result<Response<MappingResponse>, MdmError> {
        if identifier.identifier.trim().is_empty() || identifier.system_name.trim().is_empty() {
            return Err(MdmError::InvalidArgument(format!(
                "cannot cross-map incomplete identifier '{identifier}'"
            )));
        }
        Ok(self.cross_map(&identifier.system_name, &identifier.identifier, target_system))
    }

    pub fn search(&self, criteria: &Search) -> PagedResponse<Vec<T>> {
        debug!(entity = self.entity_name, "EntityService::search");
        let response: PagedResponse<Vec<T>> = self.requester.search(&self.uris.search(), criteria);
        response.log("EntityService::search");
        response
    }

    /// Forget the cached token for `id`.
    pub fn invalidate(&self, id: EntityId) {
        self.tokens.invalidate(id);
    }

    /// Forget every cached token.
    pub fn clear(&self) {
        self.tokens.clear();
    }

    fn fetch(&self, uri: &str) -> Response<T> {
        let response = self.requester.get(uri);
        if response.is_valid {
            self.remember(&response);
        }
        response
    }

    /// POST `message` to `uri`, then GET the resource it created.
    fn create_then_fetch<Req, Resp>(
        &self,
        uri: &str,
        message: &Req,
        request_info: Option<RequestInfo>,
    ) -> Response<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let created: Response<Resp> = self.requester.create(uri, message, request_info);
        if !created.is_valid {
            return created;
        }
        let Some(location) = created.location.as_deref() else {
            warn!(uri, "create succeeded without a location to fetch");
            return Response::internal_error(format!("create at {uri} returned no location"))
                .with_request_id(created.request_id);
        };
        debug!(location, "created; fetching canonical representation");
        let fetched = self.requester.get::<Resp>(location);
        fetched.with_request_id(created.request_id)
    }

    fn remember(&self, response: &Response<T>) {
        let Some(id) = response.message.as_ref().and_then(|contract| contract.mdm_key()) else {
            debug!(entity = self.entity_name, "response names no native id; token not cached");
            return;
        };
        match &response.concurrency_token {
            Some(token) => self.tokens.store(id, token.clone()),
            None => self.tokens.invalidate(id),
        }
    }
}
