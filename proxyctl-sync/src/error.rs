//! Error types for proxyctl-sync.

use std::path::PathBuf;

use thiserror::Error;

use proxyctl_core::{ConfigError, ProxyError};

/// All errors that can arise from provisioning and state operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote operation failed.
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file serialization/deserialization error.
    #[error("state file JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection settings are unusable.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// The remote failure behind this error, if any.
    pub fn as_proxy(&self) -> Option<&ProxyError> {
        match self {
            SyncError::Proxy(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
