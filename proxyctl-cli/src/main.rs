//! proxyctl: provision users, teams, keys and models on an LLM proxy.
//!
//! # Usage
//!
//! ```text
//! proxyctl config show | set-url <url> | set-key <key>
//! proxyctl user create [--id] [--email] [--alias] [--role] [--max-budget] [--model ..]
//! proxyctl user show <id> | delete <id>
//! proxyctl team create [--id] [--alias] [--model ..] [--max-budget] | show <id> | delete <id>
//! proxyctl member add <team> <user> [--role]
//! proxyctl member remove <team> <user> [--delete-keys] [--prune-memberships] [--delete-orphan]
//! proxyctl key generate [--user] [--team] [--alias] [--model ..] | show <token> | delete <token>
//! proxyctl model create <name> --upstream <model> [--api-base] [--id] | show <id> | delete <id>
//! proxyctl state list [--json] | refresh
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, key::KeyCommand, member::MemberCommand, model::ModelCommand,
    state::StateCommand, team::TeamCommand, user::UserCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "proxyctl",
    version,
    about = "Provision and clean up entities on an LLM proxy admin API",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change the proxy connection settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Create, inspect and delete users.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Create, inspect and delete teams.
    Team {
        #[command(subcommand)]
        command: TeamCommand,
    },

    /// Add users to teams and remove them with cleanup.
    Member {
        #[command(subcommand)]
        command: MemberCommand,
    },

    /// Generate, inspect and delete virtual keys.
    Key {
        #[command(subcommand)]
        command: KeyCommand,
    },

    /// Create, inspect and delete model deployments.
    Model {
        #[command(subcommand)]
        command: ModelCommand,
    },

    /// Inspect the local record of provisioned entities.
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::User { command } => commands::user::run(command),
        Commands::Team { command } => commands::team::run(command),
        Commands::Member { command } => commands::member::run(command),
        Commands::Key { command } => commands::key::run(command),
        Commands::Model { command } => commands::model::run(command),
        Commands::State { command } => commands::state::run(command),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
