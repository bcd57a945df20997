//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe a panel round-trip as plain
//! data. `IspRequest::build` produces the former and `IspRequest::parse`
//! consumes the latter, so the core can be driven without a network.
//! `Transport` is the seam `IspRequest::send` uses when the caller wants the
//! core to perform the GET itself; `UreqTransport` is the blocking
//! implementation shipped with the crate.
//!
//! The panel API only ever receives GET requests, so there is no method or
//! body field.

use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

/// A panel request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Fully-qualified URL including the query string.
    pub url: String,
}

/// A panel response described as plain data.
///
/// Constructed by a `Transport` (or by the caller directly) and passed to
/// `IspRequest::parse`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Executes a single GET against the panel.
///
/// Implementations return the response as data whenever the server
/// answered, whatever the status; `Err` is reserved for failures where no
/// response exists at all.
pub trait Transport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError>,
{
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Build a transport whose calls give up after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        // Statuses are interpreted by the core, not by ureq.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut response = self
            .agent
            .get(&request.url)
            .call()
            .map_err(|e| ApiError::TransportFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::TransportFailure(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
