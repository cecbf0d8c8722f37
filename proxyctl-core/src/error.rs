//! Error types for proxyctl-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The three ways a remote call can fail, as far as callers are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The entity is absent, or not yet visible.
    NotFound,
    /// Network failure or request timeout; the same call may succeed later.
    Transient,
    /// Rejected by the backend; retrying the same request will not help.
    Permanent,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::NotFound => write!(f, "not found"),
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Permanent => write!(f, "permanent"),
        }
    }
}

/// A classified failure of a remote operation.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The backend says the entity does not exist.
    #[error("entity not found (HTTP {status}): {message}")]
    NotFound { status: u16, message: String },

    /// The backend refused the request.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend or an intermediary gave up waiting.
    #[error("request timed out (HTTP {status}): {message}")]
    Timeout { status: u16, message: String },

    /// No response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// A success response whose body is not the expected shape.
    #[error("unexpected response body from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProxyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProxyError::NotFound { .. } => ErrorClass::NotFound,
            ProxyError::Timeout { .. } | ProxyError::Transport(_) => ErrorClass::Transient,
            ProxyError::Rejected { .. } | ProxyError::Decode { .. } => ErrorClass::Permanent,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    /// NotFound without an HTTP response behind it, for reads that succeed
    /// but do not yet show the entity.
    pub fn not_visible(message: impl Into<String>) -> Self {
        ProxyError::NotFound {
            status: 200,
            message: message.into(),
        }
    }
}

/// All errors that can arise while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("no proxy base URL configured; run `proxyctl config set-url <url>` or set PROXYCTL_BASE_URL")]
    MissingBaseUrl,

    #[error("invalid value for {name}: {value}")]
    InvalidOverride { name: &'static str, value: String },
}
