//! `proxyctl config show | set-url <url> | set-key <key>`

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use proxyctl_core::config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings (file plus environment overrides).
    Show,

    /// Set the proxy base URL, e.g. http://localhost:4000.
    SetUrl { url: String },

    /// Set the admin key sent as a bearer token.
    SetKey { key: String },
}

pub fn run(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::SetUrl { url } => set_url(url),
        ConfigCommand::SetKey { key } => set_key(key),
    }
}

fn show() -> Result<()> {
    let home = super::home()?;
    let cfg = config::load_at(&home, |name| std::env::var(name).ok())
        .context("failed to load config")?;

    println!("config file:  {}", config::config_path_at(&home).display());
    println!("base_url:     {}", cfg.base_url);
    println!(
        "api_key:      {}",
        if cfg.api_key.is_some() { "set" } else { "not set" }
    );
    println!("timeout:      {}s", cfg.timeout_secs);
    println!(
        "retry:        {} attempts, {}ms initial, {}ms max",
        cfg.retry.max_attempts, cfg.retry.initial_delay_ms, cfg.retry.max_delay_ms
    );
    Ok(())
}

fn set_url(url: String) -> Result<()> {
    let url = url.trim().trim_end_matches('/').to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("'{url}' is not an http(s) URL");
    }
    let home = super::home()?;
    let mut cfg = config::load_file_at(&home).context("failed to load config")?;
    cfg.base_url = url;
    config::save_at(&home, &cfg).context("failed to save config")?;
    println!("✓ Proxy URL set to {}", cfg.base_url);
    Ok(())
}

fn set_key(key: String) -> Result<()> {
    let key = key.trim().to_string();
    if key.is_empty() {
        bail!("admin key must not be empty");
    }
    let home = super::home()?;
    let mut cfg = config::load_file_at(&home).context("failed to load config")?;
    cfg.api_key = Some(key);
    config::save_at(&home, &cfg).context("failed to save config")?;
    println!("✓ Admin key saved to {}", config::config_path_at(&home).display());
    Ok(())
}
