//! HTTP transport types and the transport capability consumed by the core.
//!
//! # Design
//! Requests and responses are plain owned data. The core never opens a
//! socket itself: every round-trip goes through an [`HttpTransport`] supplied
//! by the host, which owns pooling, TLS, proxying and timeouts. Whatever the
//! transport returns is interpreted by the `Requester`; whatever it fails with
//! is folded into an `InternalError` response envelope.

use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// The body has already been read in full by the transport, so nothing
/// outlives the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Failures raised by a transport before a complete response was obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// The HTTP capability the host supplies to the core.
///
/// Implementors only need [`HttpTransport::send`]; the verb helpers build the
/// corresponding [`HttpRequest`] and delegate to it.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    fn get(&self, uri: &str, headers: Vec<(String, String)>) -> Result<HttpResponse, TransportError> {
        self.send(&HttpRequest {
            method: HttpMethod::Get,
            path: uri.to_string(),
            headers,
            body: None,
        })
    }

    fn post(
        &self,
        uri: &str,
        headers: Vec<(String, String)>,
        body: String,
    ) -> Result<HttpResponse, TransportError> {
        self.send(&HttpRequest {
            method: HttpMethod::Post,
            path: uri.to_string(),
            headers,
            body: Some(body),
        })
    }

    fn delete(&self, uri: &str, headers: Vec<(String, String)>) -> Result<HttpResponse, TransportError> {
        self.send(&HttpRequest {
            method: HttpMethod::Delete,
            path: uri.to_string(),
            headers,
            body: None,
        })
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}
