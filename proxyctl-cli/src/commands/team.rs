//! `proxyctl team create | show | delete`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use proxyctl_core::{EntityRef, TeamId, TeamSpec};

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team and wait until the proxy serves it.
    Create(CreateArgs),

    /// Print the proxy's record of a team as JSON.
    Show { id: String },

    /// Delete a team.
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Team id. A UUID is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub alias: Option<String>,

    /// Model the team may call. Repeatable.
    #[arg(long = "model", value_name = "MODEL")]
    pub models: Vec<String>,

    #[arg(long)]
    pub max_budget: Option<f64>,
}

pub fn run(cmd: TeamCommand) -> Result<()> {
    match cmd {
        TeamCommand::Create(args) => args.run(),
        TeamCommand::Show { id } => show(id),
        TeamCommand::Delete { id } => super::delete(EntityRef::team(&TeamId::from(id))),
    }
}

impl CreateArgs {
    pub fn run(self) -> Result<()> {
        let team_id = self.id.map(TeamId::from).unwrap_or_else(TeamId::generate);
        let spec = TeamSpec {
            team_alias: self.alias,
            models: self.models,
            max_budget: self.max_budget,
            ..TeamSpec::with_id(team_id)
        };

        let (home, provisioner) = super::connect()?;
        provisioner
            .create_team_verified(&spec)
            .with_context(|| format!("failed to create team '{}'", spec.team_id))?;

        super::record(&home, EntityRef::team(&spec.team_id), spec.team_alias.clone())?;
        println!("✓ Created team {}", spec.team_id);
        Ok(())
    }
}

fn show(id: String) -> Result<()> {
    let (_, provisioner) = super::connect()?;
    let info = provisioner
        .client()
        .get_team(&TeamId::from(id.clone()))
        .with_context(|| format!("failed to read team '{id}'"))?;
    super::print_json(&info)
}
