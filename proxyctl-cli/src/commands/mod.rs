pub mod config;
pub mod key;
pub mod member;
pub mod model;
pub mod state;
pub mod team;
pub mod user;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use proxyctl_core::{config as proxy_config, EntityRef};
use proxyctl_gateway::HttpGateway;
use proxyctl_sync::{state as local_state, Deletion, Provisioner};

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Home directory plus a provisioner for the configured proxy.
pub fn connect() -> Result<(PathBuf, Provisioner<HttpGateway>)> {
    let home = home()?;
    let config = proxy_config::load_at(&home, |name| std::env::var(name).ok())
        .context("failed to load config")?;
    let provisioner = Provisioner::from_config(&config).context("invalid proxy config")?;
    Ok((home, provisioner))
}

pub fn record(home: &Path, entity: EntityRef, label: Option<String>) -> Result<()> {
    local_state::update_at(home, |s| s.record(entity, label))
        .context("failed to update state file")
}

pub fn forget(home: &Path, entity: &EntityRef) -> Result<()> {
    local_state::update_at(home, |s| {
        s.remove(entity);
    })
    .context("failed to update state file")
}

/// Delete remotely, then drop the local record.
pub fn delete(entity: EntityRef) -> Result<()> {
    let (home, provisioner) = connect()?;
    let deletion = provisioner
        .delete_entity(&entity)
        .with_context(|| format!("failed to delete {entity}"))?;
    forget(&home, &entity)?;
    match deletion {
        Deletion::Deleted => println!("✓ Deleted {entity}"),
        Deletion::AlreadyGone => println!("✓ {entity} was already gone"),
    }
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON")?
    );
    Ok(())
}
