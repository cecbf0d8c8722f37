//! `proxyctl key generate | show | delete`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use proxyctl_core::{EntityRef, KeySpec, KeyToken, TeamId, UserId};

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Generate a key and wait until the proxy serves it.
    Generate(GenerateArgs),

    /// Print the proxy's record of a key as JSON.
    Show { token: String },

    /// Delete a key by hashed token or raw secret.
    Delete { token: String },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Owning user.
    #[arg(long)]
    pub user: Option<String>,

    /// Owning team.
    #[arg(long)]
    pub team: Option<String>,

    #[arg(long)]
    pub alias: Option<String>,

    /// Model the key may call. Repeatable.
    #[arg(long = "model", value_name = "MODEL")]
    pub models: Vec<String>,

    #[arg(long)]
    pub max_budget: Option<f64>,

    /// Lifetime such as 30d or 12h.
    #[arg(long)]
    pub duration: Option<String>,
}

pub fn run(cmd: KeyCommand) -> Result<()> {
    match cmd {
        KeyCommand::Generate(args) => args.run(),
        KeyCommand::Show { token } => show(token),
        KeyCommand::Delete { token } => super::delete(EntityRef::key(&KeyToken::from(token))),
    }
}

impl GenerateArgs {
    pub fn run(self) -> Result<()> {
        let spec = KeySpec {
            key_alias: self.alias,
            user_id: self.user.map(UserId::from),
            team_id: self.team.map(TeamId::from),
            models: self.models,
            max_budget: self.max_budget,
            duration: self.duration,
            metadata: None,
        };

        let (home, provisioner) = super::connect()?;
        let key = provisioner
            .generate_key_verified(&spec)
            .context("failed to generate key")?;

        super::record(&home, EntityRef::key(&key.token), spec.key_alias.clone())?;
        println!("✓ Generated key {}", key.token);
        if let Some(secret) = &key.secret {
            println!("  secret: {}", secret.bold());
            println!("  {}", "Store it now; the proxy will not show it again.".yellow());
        }
        Ok(())
    }
}

fn show(token: String) -> Result<()> {
    let (_, provisioner) = super::connect()?;
    let record = provisioner
        .client()
        .get_key(&KeyToken::from(token.clone()))
        .with_context(|| format!("failed to read key '{token}'"))?;
    super::print_json(&record)
}
