//! Tests for the `intercom-config` loader: defaults, file discovery and
//! environment overrides.

use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use intercom_config::load;

const ENV_VARS_TO_RESET: &[&str] = &[
    "INTERCOM_CONFIG",
    "INTERCOM__AUTH__SESSION_TTL_SECONDS",
    "INTERCOM__DATABASE__MAX_CONNECTIONS",
    "INTERCOM__DATABASE__URL",
    "INTERCOM__HTTP__ADDRESS",
    "INTERCOM__HTTP__PORT",
];

fn reset_environment() {
    for key in ENV_VARS_TO_RESET {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_apply_without_file_or_environment() {
    reset_environment();

    let config = load().expect("defaults should load");
    assert_eq!(config.http.address, "127.0.0.1");
    assert_eq!(config.http.port, 7080);
    assert_eq!(config.database.url, "sqlite://intercom.db");
    assert_eq!(config.database.max_connections, 10);
    assert_eq!(config.auth.session_ttl_seconds, 86_400);
}

#[test]
#[serial]
fn environment_variables_override_defaults() {
    reset_environment();
    std::env::set_var("INTERCOM__HTTP__PORT", "9000");
    std::env::set_var("INTERCOM__DATABASE__URL", "sqlite://override.db");

    let config = load().expect("configuration should load");
    assert_eq!(config.http.port, 9000);
    assert_eq!(config.database.url, "sqlite://override.db");

    reset_environment();
}

#[test]
#[serial]
fn explicit_config_file_is_honoured() {
    reset_environment();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("intercom.toml");
    fs::write(
        &path,
        r#"
[http]
address = "0.0.0.0"
port = 8123

[auth]
session_ttl_seconds = 60
"#,
    )
    .unwrap();

    std::env::set_var("INTERCOM_CONFIG", path.display().to_string());

    let config = load().expect("configuration should load");
    assert_eq!(config.http.address, "0.0.0.0");
    assert_eq!(config.http.port, 8123);
    assert_eq!(config.auth.session_ttl_seconds, 60);
    // Sections absent from the file keep their defaults.
    assert_eq!(config.database.max_connections, 10);

    reset_environment();
}

#[test]
#[serial]
fn environment_wins_over_config_file() {
    reset_environment();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("intercom.toml");
    fs::write(
        &path,
        r#"
[http]
port = 8123
"#,
    )
    .unwrap();

    std::env::set_var("INTERCOM_CONFIG", path.display().to_string());
    std::env::set_var("INTERCOM__HTTP__PORT", "9999");

    let config = load().expect("configuration should load");
    assert_eq!(config.http.port, 9999);

    reset_environment();
}
