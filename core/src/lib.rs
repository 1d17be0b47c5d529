//! Typed client for a master-data (MDM) REST service.
//!
//! # Overview
//! Issues create/read/update/delete/search calls against entity resources
//! and normalizes every outcome (success, server fault, not-found, transport
//! failure) into a uniform [`Response`] envelope. Concurrency tokens (ETags)
//! are remembered per entity so updates can be sent conditionally without
//! re-fetching first.
//!
//! # Design
//! - The host supplies an [`HttpTransport`]; the core never manages
//!   connections. [`UreqTransport`] is provided behind the `ureq` feature.
//! - [`Requester`] turns one HTTP call plus the status it expects into a
//!   [`Response`], using a pluggable [`FaultHandler`] to decide success.
//! - [`EntityService`] composes requester calls into per-entity workflows
//!   and owns the [`ConcurrencyTokenCache`].
//! - Only caller mistakes are returned as [`MdmError`]; everything past
//!   argument validation comes back inside the envelope.

pub mod cache;
pub mod config;
pub mod error;
pub mod fault;
pub mod http;
pub mod request_info;
pub mod requester;
pub mod response;
pub mod search;
pub mod service;
pub mod status;
pub mod types;
#[cfg(feature = "ureq")]
pub mod ureq_transport;

pub use cache::ConcurrencyTokenCache;
pub use config::MdmConfig;
pub use error::MdmError;
pub use fault::{AcceptAnyFaultHandler, Fault, FaultHandler, StandardFaultHandler};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use request_info::RequestInfo;
pub use requester::{IdentityProvider, Requester};
pub use response::{PagedResponse, Response};
pub use search::{Comparison, Criteria, Feed, FeedEntry, FeedLink, Search, SearchOperator, SearchOptions};
pub use service::{EntityService, EntityUris};
pub use status::StatusCode;
pub use types::{EntityId, Mapping, MappingResponse, MdmEntity, MdmId, SystemData};
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;
