//! # proxyctl-gateway
//!
//! Synchronous request/response transport to the proxy admin API.
//!
//! [`Gateway`] is the only capability the rest of the workspace needs: send a
//! method, path and optional JSON body, get back a status and body, or a
//! [`TransportError`] when no response arrived. Non-2xx statuses are ordinary
//! responses here; interpreting them is the caller's job.
//!
//! [`HttpGateway`] is the `ureq` implementation. With the `mock` feature,
//! [`mock::MockBackend`] emulates the admin API in memory.

pub mod http;
#[cfg(feature = "mock")]
pub mod mock;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub use http::HttpGateway;

/// HTTP method of an admin call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw response: any status, body as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request produced no usable response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    Request(String),
}

/// One synchronous admin call.
pub trait Gateway {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse, TransportError>;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse, TransportError> {
        (**self).call(method, path, body)
    }
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse, TransportError> {
        (**self).call(method, path, body)
    }
}
