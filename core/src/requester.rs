//! Issues HTTP calls and normalizes their outcomes into response envelopes.
//!
//! # Design
//! Every operation builds an `HttpRequest`, hands it to the transport, and
//! interprets the `HttpResponse` against the status the operation expects.
//! Anything that goes wrong on the way (transport failure, a body that will
//! not serialize or deserialize, an unusable `Location`) is caught here and
//! reported as an `InternalError` envelope; nothing past argument validation
//! is ever returned as `Err` or raised.
//!
//! The requester holds no mutable state and can be shared across threads.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

use crate::config::MdmConfig;
use crate::error::MdmError;
use crate::fault::{Fault, FaultHandler, StandardFaultHandler};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::request_info::RequestInfo;
use crate::response::{PagedResponse, Response};
use crate::search::{Feed, Search};
use crate::status::StatusCode;

/// Caller identity, sent on every request.
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Encoded `RequestInfo`, sent on every mutating request.
pub const REQUEST_INFO_HEADER: &str = "x-mdm-request";
pub const IF_MATCH_HEADER: &str = "if-match";
pub const ETAG_HEADER: &str = "etag";
pub const LOCATION_HEADER: &str = "location";
const CONTENT_TYPE_HEADER: &str = "content-type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Supplies the user name for the identity header, evaluated per request.
pub type IdentityProvider = Arc<dyn Fn() -> String + Send + Sync>;

pub struct Requester {
    transport: Arc<dyn HttpTransport>,
    fault_handler: Arc<dyn FaultHandler>,
    identity: IdentityProvider,
    source_system: String,
}

impl Requester {
    /// Uses the configured user name as identity, falling back to the
    /// process owner read once at construction.
    pub fn new(transport: impl HttpTransport + 'static, config: &MdmConfig) -> Self {
        let user_name = config.user_name.clone().unwrap_or_else(process_user_name);
        Self {
            transport: Arc::new(transport),
            fault_handler: Arc::new(StandardFaultHandler),
            identity: Arc::new(move || user_name.clone()),
            source_system: config.source_system.clone(),
        }
    }

    pub fn with_fault_handler(mut self, handler: impl FaultHandler + 'static) -> Self {
        self.fault_handler = Arc::new(handler);
        self
    }

    pub fn with_identity(mut self, provider: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.identity = Arc::new(provider);
        self
    }

    /// Source system stamped on requests that do not name one.
    pub fn source_system(&self) -> &str {
        &self.source_system
    }

    /// GET `uri`, expecting `200 OK` and a `T` body.
    ///
    /// The entity tag of a successful response becomes the envelope's
    /// concurrency token.
    pub fn get<T: DeserializeOwned>(&self, uri: &str) -> Response<T> {
        debug!(uri, "Start: Requester::get");
        let response = self.guard(None, || {
            let request = self.identified(HttpMethod::Get, uri);
            let raw = self.transport.send(&request)?;
            let mut response = self.classify(&raw, StatusCode::Ok);
            if response.is_valid {
                response.concurrency_token = raw.header(ETAG_HEADER).map(str::to_string);
                response.message = Some(decode_body(&raw.body)?);
            }
            Ok(response)
        });
        debug!(uri, status = %response.status, "Finish: Requester::get");
        response
    }

    /// POST `body` to `uri`, succeeding on `expected`.
    ///
    /// Sends the correlation header, and `if-match` when a concurrency token
    /// is given. A `Location` on a successful response is made absolute
    /// against the scheme and authority of `uri`. The body of the response
    /// is not read; `T` only names the envelope type.
    pub fn post<B: Serialize, T>(
        &self,
        uri: &str,
        body: &B,
        expected: StatusCode,
        concurrency_token: Option<&str>,
        request_info: Option<RequestInfo>,
    ) -> Response<T> {
        debug!(uri, %expected, "Start: Requester::post");
        let info = request_info.unwrap_or_default().populated(&self.source_system);
        let response = self.guard(Some(&info.request_id), || {
            let mut request = self
                .correlated(HttpMethod::Post, uri, &info)?
                .with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE)
                .with_body(encode_body(body)?);
            if let Some(token) = concurrency_token {
                request = request.with_header(IF_MATCH_HEADER, token);
            }
            let raw = self.transport.send(&request)?;
            let mut response = self.classify(&raw, expected);
            if response.is_valid {
                response.location = raw
                    .header(LOCATION_HEADER)
                    .map(|location| resolve_location(uri, location))
                    .transpose()?;
            }
            Ok(response)
        });
        debug!(uri, status = %response.status, request_id = %info.request_id, "Finish: Requester::post");
        response
    }

    /// POST expecting `201 Created`.
    pub fn create<B: Serialize, T>(&self, uri: &str, body: &B, request_info: Option<RequestInfo>) -> Response<T> {
        self.post(uri, body, StatusCode::Created, None, request_info)
    }

    /// Conditional POST expecting `204 No Content`.
    pub fn update<B: Serialize, T>(
        &self,
        uri: &str,
        concurrency_token: &str,
        body: &B,
        request_info: Option<RequestInfo>,
    ) -> Response<T> {
        self.post(uri, body, StatusCode::NoContent, Some(concurrency_token), request_info)
    }

    /// DELETE `uri`, expecting `200 OK`. No body is read.
    pub fn delete<T>(&self, uri: &str, request_info: Option<RequestInfo>) -> Response<T> {
        debug!(uri, "Start: Requester::delete");
        let info = request_info.unwrap_or_default().populated(&self.source_system);
        let response = self.guard(Some(&info.request_id), || {
            let request = self.correlated(HttpMethod::Delete, uri, &info)?;
            let raw = self.transport.send(&request)?;
            Ok(self.classify(&raw, StatusCode::Ok))
        });
        debug!(uri, status = %response.status, request_id = %info.request_id, "Finish: Requester::delete");
        response
    }

    /// POST `criteria` to `uri` and read the result feed.
    ///
    /// A `404` means nothing matched: the envelope is valid, holds an empty
    /// list and no fault. Any other unexpected status is a fault.
    pub fn search<T: DeserializeOwned>(&self, uri: &str, criteria: &Search) -> PagedResponse<Vec<T>> {
        debug!(uri, "Start: Requester::search");
        let mut next_page = None;
        let response = self.guard(None, || {
            let request = self
                .identified(HttpMethod::Post, uri)
                .with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE)
                .with_body(encode_body(criteria)?);
            let raw = self.transport.send(&request)?;
            let status = StatusCode::from_u16(raw.status);

            if self.fault_handler.handle(status, StatusCode::Ok) {
                let feed: Feed<T> = decode_body(&raw.body)?;
                next_page = feed
                    .next_page()
                    .map(|href| resolve_location(uri, href))
                    .transpose()?;
                let mut response = Response::success(status);
                response.message = Some(feed.into_items());
                return Ok(response);
            }

            if status == StatusCode::NotFound {
                debug!(uri, "search matched nothing");
                let mut response = Response::success(status);
                response.message = Some(Vec::new());
                return Ok(response);
            }

            Ok(Response::failure(status, Fault::from_body(status, &raw.body)))
        });
        debug!(uri, status = %response.status, "Finish: Requester::search");
        PagedResponse::new(response, next_page)
    }

    fn identified(&self, method: HttpMethod, uri: &str) -> HttpRequest {
        HttpRequest::new(method, uri).with_header(USER_NAME_HEADER, (self.identity)())
    }

    fn correlated(&self, method: HttpMethod, uri: &str, info: &RequestInfo) -> Result<HttpRequest, MdmError> {
        Ok(self
            .identified(method, uri)
            .with_header(REQUEST_INFO_HEADER, info.encode()?))
    }

    fn classify<T>(&self, raw: &HttpResponse, expected: StatusCode) -> Response<T> {
        let status = StatusCode::from_u16(raw.status);
        if self.fault_handler.handle(status, expected) {
            Response::success(status)
        } else {
            Response::failure(status, Fault::from_body(status, &raw.body))
        }
    }

    /// Run one request, turning any failure into an `InternalError` envelope
    /// and stamping the request id on whatever comes out.
    fn guard<T>(
        &self,
        request_id: Option<&str>,
        call: impl FnOnce() -> Result<Response<T>, MdmError>,
    ) -> Response<T> {
        let response = call().unwrap_or_else(|err| {
            error!(error = %err, request_id, "request failed");
            Response::internal_error(err.to_string())
        });
        match request_id {
            Some(id) => response.with_request_id(Some(id.to_string())),
            None => response,
        }
    }
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("source_system", &self.source_system)
            .finish_non_exhaustive()
    }
}

/// Make `location` absolute. Absolute values pass through untouched;
/// relative ones are taken from the root of `request_uri`'s authority.
pub fn resolve_location(request_uri: &str, location: &str) -> Result<String, MdmError> {
    let location = location.trim();
    if Url::parse(location).is_ok() {
        return Ok(location.to_string());
    }
    let invalid = |reason: String| MdmError::InvalidUri {
        uri: request_uri.to_string(),
        reason,
    };
    let base = Url::parse(request_uri).map_err(|e| invalid(e.to_string()))?;
    let resolved = base
        .join(&format!("/{}", location.trim_start_matches('/')))
        .map_err(|e| invalid(e.to_string()))?;
    Ok(resolved.into())
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, MdmError> {
    serde_json::to_string(body).map_err(|e| MdmError::Serialization(e.to_string()))
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, MdmError> {
    serde_json::from_str(body).map_err(|e| MdmError::Deserialization(e.to_string()))
}

fn process_user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string())
}
