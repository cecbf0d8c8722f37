//! `proxyctl user create | show | delete`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use proxyctl_core::{EntityRef, UserId, UserSpec};

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a user and wait until the proxy serves it.
    Create(CreateArgs),

    /// Print the proxy's record of a user as JSON.
    Show { id: String },

    /// Delete a user. Keys and memberships are left alone.
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// User id. A UUID is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub alias: Option<String>,

    /// Proxy role, e.g. internal_user or proxy_admin.
    #[arg(long)]
    pub role: Option<String>,

    #[arg(long)]
    pub max_budget: Option<f64>,

    /// Model the user may call. Repeatable.
    #[arg(long = "model", value_name = "MODEL")]
    pub models: Vec<String>,
}

pub fn run(cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Create(args) => args.run(),
        UserCommand::Show { id } => show(id),
        UserCommand::Delete { id } => super::delete(EntityRef::user(&UserId::from(id))),
    }
}

impl CreateArgs {
    pub fn run(self) -> Result<()> {
        let user_id = self.id.map(UserId::from).unwrap_or_else(UserId::generate);
        let spec = UserSpec {
            user_email: self.email,
            user_alias: self.alias,
            user_role: self.role,
            max_budget: self.max_budget,
            models: self.models,
            ..UserSpec::with_id(user_id)
        };

        let (home, provisioner) = super::connect()?;
        provisioner
            .create_user_verified(&spec)
            .with_context(|| format!("failed to create user '{}'", spec.user_id))?;

        let label = spec.user_email.clone().or_else(|| spec.user_alias.clone());
        super::record(&home, EntityRef::user(&spec.user_id), label)?;
        println!("✓ Created user {}", spec.user_id);
        Ok(())
    }
}

fn show(id: String) -> Result<()> {
    let (_, provisioner) = super::connect()?;
    let info = provisioner
        .client()
        .get_user(&UserId::from(id.clone()))
        .with_context(|| format!("failed to read user '{id}'"))?;
    super::print_json(&info)
}
