//! `proxyctl member add | remove`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use proxyctl_core::{MemberRole, MemberSpec, TeamId, UserId};
use proxyctl_sync::{CascadeOptions, CascadeReport, CleanupOutcome, PrimaryRemoval};

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Add a user to a team and wait until the membership is visible.
    Add(AddArgs),

    /// Remove a user from a team, optionally cleaning up after them.
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub team: String,
    pub user: String,

    /// user | admin
    #[arg(long, default_value_t = MemberRole::User)]
    pub role: MemberRole,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    pub team: String,
    pub user: String,

    /// Delete every key the user holds.
    #[arg(long)]
    pub delete_keys: bool,

    /// Also remove the user from every other team.
    #[arg(long)]
    pub prune_memberships: bool,

    /// Delete the user if no team membership remains.
    #[arg(long)]
    pub delete_orphan: bool,
}

pub fn run(cmd: MemberCommand) -> Result<()> {
    match cmd {
        MemberCommand::Add(args) => args.run(),
        MemberCommand::Remove(args) => args.run(),
    }
}

impl AddArgs {
    pub fn run(self) -> Result<()> {
        let spec = MemberSpec {
            role: self.role,
            ..MemberSpec::new(TeamId::from(self.team), UserId::from(self.user))
        };
        let (_, provisioner) = super::connect()?;
        provisioner.add_member_verified(&spec).with_context(|| {
            format!("failed to add '{}' to team '{}'", spec.user_id, spec.team_id)
        })?;
        println!(
            "✓ Added {} to team {} as {}",
            spec.user_id, spec.team_id, spec.role
        );
        Ok(())
    }
}

impl RemoveArgs {
    pub fn run(self) -> Result<()> {
        let team = TeamId::from(self.team);
        let user = UserId::from(self.user);
        let options = CascadeOptions {
            delete_keys: self.delete_keys,
            remove_other_memberships: self.prune_memberships,
            delete_orphan: self.delete_orphan,
        };

        let (_, provisioner) = super::connect()?;
        let report = provisioner
            .remove_member_cascading(&team, &user, options)
            .with_context(|| format!("failed to remove '{user}' from team '{team}'"))?;
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &CascadeReport) {
    match report.primary {
        PrimaryRemoval::Removed => println!("✓ Removed {} from team {}", report.user, report.team),
        PrimaryRemoval::AlreadyAbsent => println!(
            "✓ {} was not a member of team {}",
            report.user, report.team
        ),
    }
    for step in &report.steps {
        let label = match &step.outcome {
            CleanupOutcome::Skipped => "skipped".bright_black().to_string(),
            CleanupOutcome::Succeeded => "ok".green().to_string(),
            CleanupOutcome::FailedNonFatal { .. } => "failed".yellow().bold().to_string(),
        };
        println!("  {:<20} {:<8} {}", step.step.to_string(), label, step.detail);
    }
    if report.has_failures() {
        println!("Some cleanup steps failed; re-run the same command to retry them.");
    }
}
