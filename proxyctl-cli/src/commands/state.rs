//! `proxyctl state list [--json]` and `proxyctl state refresh`

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use proxyctl_sync::{refresh_at, state, RefreshStatus};

#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// List entities created through proxyctl.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check every recorded entity against the proxy; drop the ones that are gone.
    Refresh,
}

pub fn run(cmd: StateCommand) -> Result<()> {
    match cmd {
        StateCommand::List { json } => list(json),
        StateCommand::Refresh => refresh(),
    }
}

#[derive(Tabled)]
struct StateTableRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "label")]
    label: String,
    #[tabled(rename = "created")]
    created: String,
    #[tabled(rename = "last verified")]
    verified: String,
}

fn list(json: bool) -> Result<()> {
    let home = super::home()?;
    let state = state::load_at(&home).context("failed to load state file")?;

    if json {
        return super::print_json(&state);
    }
    if state.is_empty() {
        println!("No entities recorded.");
        return Ok(());
    }

    let rows: Vec<StateTableRow> = state
        .entries()
        .map(|e| StateTableRow {
            kind: e.entity.kind.to_string(),
            id: e.entity.id.clone(),
            label: e.label.clone().unwrap_or_default(),
            created: e.created_at.format("%Y-%m-%d %H:%M").to_string(),
            verified: format_age(e.verified_at),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn refresh() -> Result<()> {
    let (home, provisioner) = super::connect()?;
    let outcomes = refresh_at(&home, &provisioner).context("refresh failed")?;

    if outcomes.is_empty() {
        println!("Nothing to refresh.");
        return Ok(());
    }
    let mut gone = 0;
    for outcome in &outcomes {
        match outcome.status {
            RefreshStatus::Present => println!("  {} {}", "■".green().bold(), outcome.entity),
            RefreshStatus::Gone => {
                gone += 1;
                println!("  {} {} (gone, removed)", "■".red().bold(), outcome.entity);
            }
        }
    }
    println!(
        "✓ Checked {} entities, {} removed",
        outcomes.len(),
        gone
    );
    Ok(())
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
