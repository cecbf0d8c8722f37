use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

use proxyctl_core::{config, EntityKind, EntityRef};
use proxyctl_sync::state;
use tempfile::TempDir;

/// Port 9 (discard) is closed on test hosts.
const CLOSED_PROXY: &str = "http://127.0.0.1:9";

fn proxyctl_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("proxyctl"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove(config::ENV_BASE_URL)
        .env_remove(config::ENV_API_KEY)
        .env_remove(config::ENV_TIMEOUT_SECS)
        .env_remove("RUST_LOG");
    cmd
}

fn offline_cmd(home: &Path) -> Command {
    let mut cmd = proxyctl_cmd(home);
    cmd.env(config::ENV_BASE_URL, CLOSED_PROXY)
        .env(config::ENV_TIMEOUT_SECS, "2");
    cmd
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_defaults() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("http://localhost:4000"))
        .stdout(contains("not set"));
}

#[test]
fn config_set_url_persists() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .args(["config", "set-url", "https://proxy.internal:4000/"])
        .assert()
        .success();

    assert!(config::config_path_at(home.path()).exists());
    proxyctl_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("https://proxy.internal:4000"));
}

#[test]
fn config_set_url_rejects_non_http() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .args(["config", "set-url", "ftp://proxy"])
        .assert()
        .failure()
        .stderr(contains("not an http(s) URL"));
}

#[test]
fn config_show_never_prints_the_key() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .args(["config", "set-key", "sk-master-secret"])
        .assert()
        .success();
    proxyctl_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("api_key:      set"))
        .stdout(contains("sk-master-secret").not());
}

// ---------------------------------------------------------------------------
// state
// ---------------------------------------------------------------------------

#[test]
fn empty_state_list() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .args(["state", "list"])
        .assert()
        .success()
        .stdout(contains("No entities recorded."));
}

#[test]
fn state_list_shows_recorded_entities() {
    let home = TempDir::new().expect("home");
    state::update_at(home.path(), |s| {
        s.record(
            EntityRef::new(EntityKind::User, "u-1"),
            Some("ada@example.com".into()),
        );
        s.record(EntityRef::new(EntityKind::Model, "m-1"), Some("gpt-4o".into()));
    })
    .expect("seed state");

    proxyctl_cmd(home.path())
        .args(["state", "list"])
        .assert()
        .success()
        .stdout(contains("u-1"))
        .stdout(contains("ada@example.com"))
        .stdout(contains("gpt-4o"));

    let output = proxyctl_cmd(home.path())
        .args(["state", "list", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["entities"]["user/u-1"]["kind"], "user");
}

#[test]
fn refresh_with_empty_state_needs_no_proxy() {
    let home = TempDir::new().expect("home");
    offline_cmd(home.path())
        .args(["state", "refresh"])
        .assert()
        .success()
        .stdout(contains("Nothing to refresh."));
}

#[test]
fn refresh_keeps_state_when_proxy_is_unreachable() {
    let home = TempDir::new().expect("home");
    state::update_at(home.path(), |s| {
        s.record(EntityRef::new(EntityKind::Team, "t-1"), None);
    })
    .expect("seed state");

    offline_cmd(home.path())
        .args(["state", "refresh"])
        .assert()
        .failure()
        .stderr(contains("transport error"));

    let after = state::load_at(home.path()).expect("load");
    assert!(after.get(&EntityRef::new(EntityKind::Team, "t-1")).is_some());
}

// ---------------------------------------------------------------------------
// remote commands without a proxy
// ---------------------------------------------------------------------------

#[test]
fn create_against_closed_port_reports_transport_error() {
    let home = TempDir::new().expect("home");
    offline_cmd(home.path())
        .args(["user", "create", "--id", "u-1", "--email", "ada@example.com"])
        .assert()
        .failure()
        .stderr(contains("failed to create user 'u-1'"))
        .stderr(contains("transport error"));

    assert!(state::load_at(home.path()).expect("load").is_empty());
}

#[test]
fn member_remove_against_closed_port_fails() {
    let home = TempDir::new().expect("home");
    offline_cmd(home.path())
        .args(["member", "remove", "t-1", "u-1", "--delete-keys", "--delete-orphan"])
        .assert()
        .failure()
        .stderr(contains("failed to remove 'u-1' from team 't-1'"));
}

#[test]
fn unknown_member_role_is_rejected() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .args(["member", "add", "t-1", "u-1", "--role", "owner"])
        .assert()
        .failure()
        .stderr(contains("unknown member role"));
}

#[test]
fn empty_base_url_is_a_config_error() {
    let home = TempDir::new().expect("home");
    proxyctl_cmd(home.path())
        .env(config::ENV_BASE_URL, "")
        .args(["team", "show", "t-1"])
        .assert()
        .failure()
        .stderr(contains("no proxy base URL configured"));
}
