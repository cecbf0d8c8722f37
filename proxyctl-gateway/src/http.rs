//! `ureq` implementation of [`Gateway`].

use std::time::Duration;

use serde_json::Value;

use crate::{Gateway, GatewayResponse, Method, TransportError};

/// Blocking HTTP transport with a per-request timeout and bearer auth.
pub struct HttpGateway {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` and `path` joined with exactly one slash.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Gateway for HttpGateway {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse, TransportError> {
        let url = self.build_url(path);
        let mut request = self
            .agent
            .request(method.as_str(), &url)
            .set("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }

        tracing::debug!("{method} {path}");
        let result = match body {
            Some(body) => request.send_json(body.clone()),
            None => request.call(),
        };

        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(ureq::Error::Transport(transport)) => Err(map_transport(&transport)),
        }
    }
}

fn read_response(response: ureq::Response) -> Result<GatewayResponse, TransportError> {
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|e| TransportError::Body(e.to_string()))?;
    tracing::debug!("-> HTTP {status} ({} bytes)", body.len());
    Ok(GatewayResponse { status, body })
}

fn map_transport(transport: &ureq::Transport) -> TransportError {
    let message = transport.to_string();
    match transport.kind() {
        ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::ProxyConnect => {
            TransportError::Connect(message)
        }
        ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
            TransportError::Request(message)
        }
        ureq::ErrorKind::Io if message.contains("timed out") => TransportError::Timeout(message),
        _ => TransportError::Io(message),
    }
}
