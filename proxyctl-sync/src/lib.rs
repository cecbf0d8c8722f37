//! # proxyctl-sync
//!
//! Consistency layer over the proxy admin API.
//!
//! [`Provisioner`] creates entities and waits until they are readable
//! ([`reconcile`]), falls back from update to create ([`upsert`]), and removes
//! memberships with best-effort cleanup of what they leave behind
//! ([`cascade`]). [`state`] and [`refresh`] keep the local record of what was
//! provisioned in line with the proxy.

pub mod cascade;
pub mod client;
pub mod error;
pub mod provision;
pub mod reconcile;
pub mod refresh;
pub mod state;
pub mod upsert;

pub use cascade::{
    CascadeOptions, CascadeReport, CascadeStep, CleanupOutcome, PrimaryRemoval, StepReport,
};
pub use client::AdminClient;
pub use error::SyncError;
pub use provision::{Deletion, GeneratedKey, Observed, Provisioner};
pub use reconcile::{reconcile, reconcile_with, RetryPolicy, RetryState};
pub use refresh::{refresh_at, RefreshOutcome, RefreshStatus};
pub use state::{StateEntry, StateFile};
pub use upsert::{upsert, Upserted};
