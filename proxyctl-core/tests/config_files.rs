//! Config file error messages and write safety.

use assert_fs::prelude::*;
use predicates::prelude::*;
use proxyctl_core::{config, Config, ConfigError, RetrySettings};

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn corrupt_yaml_reports_the_file_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".proxyctl/config.yaml")
        .write_str("base_url: [unclosed\n  : : !!!")
        .expect("write");

    let err = config::load_at(home.path(), no_env).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "got: {err}");
}

#[test]
fn wrong_type_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".proxyctl/config.yaml")
        .write_str("timeout_secs: soon\n")
        .expect("write");

    let err = config::load_at(home.path(), no_env).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn empty_file_is_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".proxyctl/config.yaml").write_str("\n").expect("write");
    assert_eq!(config::load_at(home.path(), no_env).unwrap(), Config::default());
}

#[test]
fn save_creates_directory_and_leaves_no_tmp() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = Config {
        base_url: "https://proxy.internal".into(),
        retry: RetrySettings {
            max_attempts: 8,
            ..RetrySettings::default()
        },
        ..Config::default()
    };
    config::save_at(home.path(), &cfg).expect("save");

    home.child(".proxyctl/config.yaml")
        .assert(predicate::path::exists());
    home.child(".proxyctl/config.yaml.tmp")
        .assert(predicate::path::missing());
    home.child(".proxyctl/config.yaml")
        .assert(predicate::str::contains("max_attempts: 8"));
    assert_eq!(config::load_file_at(home.path()).unwrap(), cfg);
}

#[test]
fn unset_api_key_is_not_written() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &Config::default()).expect("save");
    home.child(".proxyctl/config.yaml")
        .assert(predicate::str::contains("api_key").not());
}
