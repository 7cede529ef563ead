//! Connection string parsing edge case tests.
//!
//! Tests edge cases that users commonly encounter with connection strings.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use mysql_client::{Config, Error, LoadBalance};

// ============================================================================
// Basic Parsing Tests
// ============================================================================

#[test]
fn test_empty_connection_string() {
    // Empty string should parse to defaults
    let config = Config::from_connection_string("").unwrap();
    assert_eq!(config.hosts, vec!["localhost".to_string()]);
    assert_eq!(config.port, 3306);
    assert!(config.pooling);
}

#[test]
fn test_whitespace_and_semicolons() {
    assert!(Config::from_connection_string("   \t\n  ").is_ok());
    assert!(Config::from_connection_string(";").is_ok());
    assert!(Config::from_connection_string(";;;").is_ok());
}

// ============================================================================
// Key-Value Edge Cases
// ============================================================================

#[test]
fn test_empty_server_is_rejected() {
    let err = Config::from_connection_string("Server=").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_missing_equals_sign() {
    let result = Config::from_connection_string("Serverlocalhost;");
    assert!(result.is_err());
}

#[test]
fn test_multiple_equals_in_value() {
    // Everything after the first '=' belongs to the value
    let config =
        Config::from_connection_string("Server=localhost;Password=pass=word=with=equals;").unwrap();
    assert_eq!(config.credentials.password(), "pass=word=with=equals");
}

#[test]
fn test_case_insensitive_keys() {
    let config1 = Config::from_connection_string("SERVER=host1;").unwrap();
    let config2 = Config::from_connection_string("server=host1;").unwrap();
    let config3 = Config::from_connection_string("Server=host1;").unwrap();

    assert_eq!(config1.hosts, config2.hosts);
    assert_eq!(config2.hosts, config3.hosts);
}

#[test]
fn test_key_aliases() {
    let a = Config::from_connection_string("Host=db;Uid=app;Pwd=x;Initial Catalog=shop").unwrap();
    let b = Config::from_connection_string("Data Source=db;User=app;Password=x;Database=shop")
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.pool_key(), b.pool_key());
}

#[test]
fn test_whitespace_around_keys_and_values() {
    let config = Config::from_connection_string("  Server  =  db1 ,  db2 ; Port = 3307 ").unwrap();
    assert_eq!(config.hosts, vec!["db1".to_string(), "db2".to_string()]);
    assert_eq!(config.port, 3307);
}

#[test]
fn test_unknown_keys_are_ignored() {
    let config = Config::from_connection_string("Server=db;SslMode=None;Charset=utf8mb4").unwrap();
    assert_eq!(config.hosts, vec!["db".to_string()]);
}

// ============================================================================
// Pool Settings
// ============================================================================

#[test]
fn test_pool_settings() {
    let config = Config::from_connection_string(
        "Server=db;Pooling=false;Connection Reset=no;Minimum Pool Size=2;\
         Maximum Pool Size=8;Connection Lifetime=60;Connection Idle Timeout=0",
    )
    .unwrap();

    assert!(!config.pooling);
    assert!(!config.connection_reset);
    assert_eq!(config.min_pool_size, 2);
    assert_eq!(config.max_pool_size, 8);
    assert_eq!(config.connection_lifetime, Duration::from_secs(60));
    assert_eq!(config.connection_idle_timeout, Duration::ZERO);
}

#[test]
fn test_min_pool_size_above_max() {
    let err =
        Config::from_connection_string("Server=db;Min Pool Size=10;Max Pool Size=5").unwrap_err();
    assert_eq!(
        err.to_string(),
        "configuration error: maximum pool size must be greater than or equal to minimum pool size"
    );
}

#[test]
fn test_zero_max_pool_size() {
    assert!(Config::from_connection_string("Server=db;Max Pool Size=0").is_err());
}

#[test]
fn test_invalid_numbers_and_booleans() {
    assert!(Config::from_connection_string("Server=db;Port=abc").is_err());
    assert!(Config::from_connection_string("Server=db;Port=70000").is_err());
    assert!(Config::from_connection_string("Server=db;Pooling=maybe").is_err());
    assert!(Config::from_connection_string("Server=db;Max Pool Size=-1").is_err());
}

// ============================================================================
// Behavior Settings
// ============================================================================

#[test]
fn test_behavior_flags() {
    let config = Config::from_connection_string(
        "Server=db;Allow User Variables=true;Old Guids=1;Force Synchronous=yes;\
         Load Balance=Random;Connect Timeout=5;Default Command Timeout=0",
    )
    .unwrap();

    assert!(config.allow_user_variables);
    assert!(config.old_guids);
    assert!(config.force_synchronous);
    assert_eq!(config.load_balance, LoadBalance::Random);
    assert_eq!(config.connect_timeout_opt(), Some(Duration::from_secs(5)));
    assert_eq!(config.command_timeout_opt(), None);
}

#[test]
fn test_pool_key_separates_users() {
    let a = Config::from_connection_string("Server=db;User=a;Password=x").unwrap();
    let b = Config::from_connection_string("Server=db;User=b;Password=x").unwrap();
    assert_ne!(a.pool_key(), b.pool_key());
}

#[test]
fn test_password_not_in_debug() {
    let config = Config::from_connection_string("Server=db;User=a;Password=hunter2").unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("hunter2"));
}
