//! Cascading membership removal.
//!
//! The proxy does not cascade deletes. Removing a user from a team leaves
//! their keys, their other memberships and possibly the user itself behind.
//! [`remove_member_cascading`] removes the membership, then runs the
//! requested cleanup steps in a fixed order:
//!
//! 1. key cleanup: delete every key listed on the user
//! 2. membership cleanup: leave every other team the user is in
//! 3. orphan cleanup: delete the user if no team membership remains
//!
//! Each step reads the user afresh and reports a [`CleanupOutcome`]: skipped
//! when not requested or when the read finds nothing to act on, succeeded
//! once it has acted. A step that fails is recorded and logged; it never stops the steps after it and
//! never fails the call. Only the membership removal itself can fail it.
//!
//! Two cascades touching the same user at the same time can race (one may
//! delete a user the other is still adding elsewhere). No locking is done.

use std::fmt;

use proxyctl_core::{KeyToken, ProxyError, TeamId, UserId};
use proxyctl_gateway::Gateway;

use crate::client::AdminClient;

/// Which cleanup steps to run after the membership is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeOptions {
    pub delete_keys: bool,
    pub remove_other_memberships: bool,
    pub delete_orphan: bool,
}

impl CascadeOptions {
    /// Every step.
    pub fn all() -> Self {
        Self {
            delete_keys: true,
            remove_other_memberships: true,
            delete_orphan: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    KeyCleanup,
    MembershipCleanup,
    OrphanCleanup,
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeStep::KeyCleanup => write!(f, "key cleanup"),
            CascadeStep::MembershipCleanup => write!(f, "membership cleanup"),
            CascadeStep::OrphanCleanup => write!(f, "orphan cleanup"),
        }
    }
}

/// Result of one cleanup step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Not requested, or nothing to act on.
    Skipped,
    /// Acted on at least one child, or found the user already deleted.
    Succeeded,
    /// Failed; recorded only.
    FailedNonFatal { message: String },
}

impl CleanupOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CleanupOutcome::FailedNonFatal { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: CascadeStep,
    pub outcome: CleanupOutcome,
    /// What the step did, e.g. `deleted 3 keys`.
    pub detail: String,
}

/// How the membership itself was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryRemoval {
    Removed,
    /// The user was not (or no longer) a member, or the team is gone.
    AlreadyAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub team: TeamId,
    pub user: UserId,
    pub primary: PrimaryRemoval,
    /// One entry per step, in execution order.
    pub steps: Vec<StepReport>,
}

impl CascadeReport {
    pub fn step(&self, step: CascadeStep) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    pub fn outcome(&self, step: CascadeStep) -> Option<&CleanupOutcome> {
        self.step(step).map(|s| &s.outcome)
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.outcome.is_failure())
    }
}

/// Remove `user` from `team`, then run the cleanup steps `options` asks for.
///
/// Returns `Err` only when the membership removal fails for a reason other
/// than the membership already being gone.
pub fn remove_member_cascading<G: Gateway>(
    client: &AdminClient<G>,
    team: &TeamId,
    user: &UserId,
    options: CascadeOptions,
) -> Result<CascadeReport, ProxyError> {
    let primary = remove_primary(client, team, user)?;

    let mut steps = Vec::with_capacity(3);
    steps.push(run_step(CascadeStep::KeyCleanup, options.delete_keys, || {
        cleanup_keys(client, user)
    }));
    steps.push(run_step(
        CascadeStep::MembershipCleanup,
        options.remove_other_memberships,
        || cleanup_memberships(client, team, user),
    ));
    steps.push(run_step(CascadeStep::OrphanCleanup, options.delete_orphan, || {
        cleanup_orphan(client, team, user)
    }));

    let report = CascadeReport {
        team: team.clone(),
        user: user.clone(),
        primary,
        steps,
    };
    if report.has_failures() {
        tracing::info!("removed {user} from {team}; some cleanup steps failed");
    } else {
        tracing::info!("removed {user} from {team}");
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Primary removal
// ---------------------------------------------------------------------------

fn remove_primary<G: Gateway>(
    client: &AdminClient<G>,
    team: &TeamId,
    user: &UserId,
) -> Result<PrimaryRemoval, ProxyError> {
    match client.remove_member(team, user) {
        Ok(()) => Ok(PrimaryRemoval::Removed),
        Err(err) if err.is_not_found() => Ok(PrimaryRemoval::AlreadyAbsent),
        // The proxy rejects removing a non-member outright. Check before
        // treating it as a real failure.
        Err(err @ ProxyError::Rejected { .. }) => match client.get_team(team) {
            Err(read_err) if read_err.is_not_found() => Ok(PrimaryRemoval::AlreadyAbsent),
            Ok(info) if !info.member_ids().contains(user) => Ok(PrimaryRemoval::AlreadyAbsent),
            _ => Err(err),
        },
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// What a step did when it did not fail.
enum StepDone {
    Nothing(String),
    Acted(String),
}

/// `Err(message)` on failure; turned into a [`StepReport`] here.
type StepResult = Result<StepDone, String>;

fn nothing(detail: impl Into<String>) -> StepResult {
    Ok(StepDone::Nothing(detail.into()))
}

fn acted(detail: impl Into<String>) -> StepResult {
    Ok(StepDone::Acted(detail.into()))
}

fn run_step<F>(step: CascadeStep, requested: bool, body: F) -> StepReport
where
    F: FnOnce() -> StepResult,
{
    if !requested {
        return StepReport {
            step,
            outcome: CleanupOutcome::Skipped,
            detail: "not requested".to_string(),
        };
    }
    match body() {
        Ok(StepDone::Nothing(detail)) => {
            tracing::debug!("{step}: {detail}");
            StepReport {
                step,
                outcome: CleanupOutcome::Skipped,
                detail,
            }
        }
        Ok(StepDone::Acted(detail)) => {
            tracing::debug!("{step}: {detail}");
            StepReport {
                step,
                outcome: CleanupOutcome::Succeeded,
                detail,
            }
        }
        Err(message) => {
            tracing::warn!("{step} failed: {message}");
            StepReport {
                step,
                outcome: CleanupOutcome::FailedNonFatal {
                    message: message.clone(),
                },
                detail: message,
            }
        }
    }
}

fn cleanup_keys<G: Gateway>(client: &AdminClient<G>, user: &UserId) -> StepResult {
    let tokens = match client.get_user(user) {
        Ok(info) => info.key_tokens(),
        Err(err) if err.is_not_found() => return nothing("user not found; no keys"),
        Err(err) => return Err(format!("reading {user}: {err}")),
    };
    if tokens.is_empty() {
        return nothing("no keys");
    }

    let mut failures = Vec::new();
    for token in &tokens {
        if let Err(err) = delete_key(client, token) {
            failures.push(format!("{token}: {err}"));
        }
    }
    finish("keys", tokens.len(), failures)
}

fn delete_key<G: Gateway>(client: &AdminClient<G>, token: &KeyToken) -> Result<(), ProxyError> {
    match client.delete_keys(std::slice::from_ref(token)) {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

fn cleanup_memberships<G: Gateway>(
    client: &AdminClient<G>,
    team: &TeamId,
    user: &UserId,
) -> StepResult {
    let others: Vec<TeamId> = match client.get_user(user) {
        Ok(info) => info.team_ids().into_iter().filter(|t| t != team).collect(),
        Err(err) if err.is_not_found() => return nothing("user not found; no memberships"),
        Err(err) => return Err(format!("reading {user}: {err}")),
    };
    if others.is_empty() {
        return nothing("no other memberships");
    }

    let mut failures = Vec::new();
    for other in &others {
        if let Err(err) = remove_primary(client, other, user) {
            failures.push(format!("{other}: {err}"));
        }
    }
    finish("memberships", others.len(), failures)
}

fn cleanup_orphan<G: Gateway>(client: &AdminClient<G>, team: &TeamId, user: &UserId) -> StepResult {
    // The team being processed may still be listed by a stale read.
    let remaining: Vec<TeamId> = match client.get_user(user) {
        Ok(info) => info.team_ids().into_iter().filter(|t| t != team).collect(),
        Err(err) if err.is_not_found() => return acted("user already gone"),
        Err(err) => return Err(format!("reading {user}: {err}")),
    };

    if !remaining.is_empty() {
        let teams: Vec<&str> = remaining.iter().map(TeamId::as_str).collect();
        return nothing(format!("kept; still in {}", teams.join(", ")));
    }
    match client.delete_users(std::slice::from_ref(user)) {
        Ok(()) => acted(format!("deleted {user}")),
        Err(err) if err.is_not_found() => acted("user already gone"),
        Err(err) => Err(format!("deleting {user}: {err}")),
    }
}

fn finish(what: &str, total: usize, failures: Vec<String>) -> StepResult {
    if failures.is_empty() {
        return acted(format!("removed {total} {what}"));
    }
    Err(format!(
        "{} of {total} {what} failed: {}",
        failures.len(),
        failures.join("; ")
    ))
}
