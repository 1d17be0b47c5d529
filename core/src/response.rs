//! Uniform result envelopes returned by every client operation.
//!
//! # Design
//! A `Response<T>` is returned for success and failure alike; callers branch
//! on `is_valid` and `status`. `fault` is populated exactly when the response
//! is invalid. A valid response may still carry no `message` when the
//! operation acknowledges without a body (create and update acknowledgements,
//! mapping deletion).

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::fault::Fault;
use crate::status::StatusCode;

#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub is_valid: bool,
    pub status: StatusCode,
    pub message: Option<T>,
    pub fault: Option<Fault>,
    pub concurrency_token: Option<String>,
    pub location: Option<String>,
    pub request_id: Option<String>,
}

impl<T> Response<T> {
    /// A valid, body-less envelope.
    pub fn success(status: StatusCode) -> Self {
        Self {
            is_valid: true,
            status,
            message: None,
            fault: None,
            concurrency_token: None,
            location: None,
            request_id: None,
        }
    }

    /// A valid `OK` envelope carrying `message`.
    pub fn ok(message: T) -> Self {
        Self {
            message: Some(message),
            ..Self::success(StatusCode::Ok)
        }
    }

    pub fn failure(status: StatusCode, fault: Fault) -> Self {
        Self {
            is_valid: false,
            status,
            message: None,
            fault: Some(fault),
            concurrency_token: None,
            location: None,
            request_id: None,
        }
    }

    /// The envelope a caught client-side failure is reported as.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::failure(StatusCode::InternalError, Fault::new(message))
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Re-type the envelope, dropping any message but keeping status, fault,
    /// concurrency token, location and request id.
    pub fn into_content_free<U>(self) -> Response<U> {
        Response {
            is_valid: self.is_valid,
            status: self.status,
            message: None,
            fault: self.fault,
            concurrency_token: self.concurrency_token,
            location: self.location,
            request_id: self.request_id,
        }
    }

    /// The fault message, if the response is invalid.
    pub fn fault_message(&self) -> Option<&str> {
        self.fault.as_ref().map(|fault| fault.message.as_str())
    }

    /// Emit a tracing event summarizing the outcome of `operation`.
    pub fn log(&self, operation: &str) {
        if self.is_valid {
            debug!(
                operation,
                status = %self.status,
                request_id = self.request_id.as_deref(),
                has_message = self.message.is_some(),
                "response valid"
            );
        } else {
            warn!(
                operation,
                status = %self.status,
                request_id = self.request_id.as_deref(),
                fault = self.fault_message(),
                "response invalid"
            );
        }
    }
}

/// A response to a search, carrying a cursor to the next page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResponse<T> {
    pub response: Response<T>,
    pub next_page: Option<String>,
}

impl<T> PagedResponse<T> {
    pub fn new(response: Response<T>, next_page: Option<String>) -> Self {
        Self { response, next_page }
    }

    pub fn into_response(self) -> Response<T> {
        self.response
    }
}

impl<T> Deref for PagedResponse<T> {
    type Target = Response<T>;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}

impl<T> DerefMut for PagedResponse<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.response
    }
}
