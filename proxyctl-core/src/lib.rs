//! proxyctl core library: entity types, tolerant records, request specs,
//! error taxonomy, response classification, configuration.
//!
//! - [`types`]: identifier newtypes and [`EntityRef`]
//! - [`records`]: tolerant decoding of backend responses
//! - [`specs`]: desired-state specs and request bodies
//! - [`error`]: [`ProxyError`], [`ErrorClass`], [`ConfigError`]
//! - [`classify`]: failure-response classification
//! - [`config`]: load / save `~/.proxyctl/config.yaml`

pub mod classify;
pub mod config;
pub mod error;
pub mod records;
pub mod specs;
pub mod types;

pub use classify::{classify, detect_not_found, error_from_response, NotFoundShape};
pub use config::{Config, RetrySettings};
pub use error::{ConfigError, ErrorClass, ProxyError};
pub use specs::{KeySpec, MemberRole, MemberSpec, ModelSpec, TeamSpec, UserSpec};
pub use types::{EntityKind, EntityRef, KeyToken, ModelId, TeamId, UserId};
