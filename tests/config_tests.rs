use std::env;

use keystone::config::KeystoneConfig;
use serial_test::serial;

const VARS: &[&str] = &[
    "KEYSTONE_SERVER_HOST",
    "KEYSTONE_SERVER_PORT",
    "KEYSTONE_DATABASE_TYPE",
    "KEYSTONE_DATABASE_URL",
    "KEYSTONE_DATABASE_MAX_CONNECTIONS",
    "KEYSTONE_LOGGING_ENABLED",
    "KEYSTONE_LOG_LEVEL",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_environment() {
    clear_env();

    let config = KeystoneConfig::load().unwrap();
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.database.db_type, "sqlite");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    clear_env();
    env::set_var("KEYSTONE_SERVER_HOST", "0.0.0.0");
    env::set_var("KEYSTONE_SERVER_PORT", "8443");
    env::set_var("KEYSTONE_DATABASE_MAX_CONNECTIONS", "12");
    env::set_var("KEYSTONE_LOG_LEVEL", "debug");

    let config = KeystoneConfig::load().unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8443);
    assert_eq!(config.database.max_connections, 12);
    assert_eq!(config.logging.level, "debug");

    clear_env();
}

#[test]
#[serial]
fn database_url_routes_by_scheme() {
    clear_env();
    env::set_var("KEYSTONE_DATABASE_TYPE", "postgres");
    env::set_var("KEYSTONE_DATABASE_URL", "postgres://db.internal/licenses");

    let config = KeystoneConfig::load().unwrap();
    assert_eq!(config.database.db_type, "postgres");
    assert_eq!(config.database.url(), "postgres://db.internal/licenses");
    assert_eq!(config.database.sqlite_url, "sqlite://keystone.db?mode=rwc");

    env::set_var("KEYSTONE_DATABASE_TYPE", "sqlite");
    env::set_var("KEYSTONE_DATABASE_URL", "sqlite::memory:");

    let config = KeystoneConfig::load().unwrap();
    assert_eq!(config.database.url(), "sqlite::memory:");

    clear_env();
}

#[test]
#[serial]
fn unparsable_port_falls_back_to_default() {
    clear_env();
    env::set_var("KEYSTONE_SERVER_PORT", "not-a-port");

    let config = KeystoneConfig::load().unwrap();
    assert_eq!(config.server.port, 5000);

    clear_env();
}

#[test]
#[serial]
fn unknown_database_type_fails_validation() {
    clear_env();
    env::set_var("KEYSTONE_DATABASE_TYPE", "mysql");

    let config = KeystoneConfig::load().unwrap();
    assert!(config.validate().is_err());

    clear_env();
}
