//! Re-check recorded entities against the proxy.

use std::path::Path;

use proxyctl_core::EntityRef;
use proxyctl_gateway::Gateway;

use crate::provision::Provisioner;
use crate::state;
use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// Still exists; `verified_at` bumped.
    Present,
    /// No longer exists; entry removed.
    Gone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub entity: EntityRef,
    pub status: RefreshStatus,
}

/// Observe every recorded entity once and update the state file.
///
/// A not-found read removes the entry. Any other failure stops the walk; the
/// entries handled before it are saved first.
pub fn refresh_at<G: Gateway>(
    home: &Path,
    provisioner: &Provisioner<G>,
) -> Result<Vec<RefreshOutcome>, SyncError> {
    let mut state = state::load_at(home)?;
    let entities: Vec<EntityRef> = state.entries().map(|e| e.entity.clone()).collect();
    let mut outcomes = Vec::with_capacity(entities.len());

    for entity in entities {
        let status = match provisioner.observe(&entity) {
            Ok(Some(_)) => {
                state.mark_verified(&entity);
                RefreshStatus::Present
            }
            Ok(None) => {
                tracing::info!("{entity} no longer exists; dropping it");
                state.remove(&entity);
                RefreshStatus::Gone
            }
            Err(err) => {
                state::save_at(home, &mut state)?;
                return Err(err.into());
            }
        };
        outcomes.push(RefreshOutcome { entity, status });
    }

    state::save_at(home, &mut state)?;
    Ok(outcomes)
}
