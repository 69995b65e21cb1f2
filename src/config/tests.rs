//! Tests for config functionality.

use crate::config::{Config, DEFAULT_CONFIG_FILE, LockConfig};
use crate::error::FlowLockError;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.lock, LockConfig::NoLock);
    assert_eq!(config.cache_dir, ".flowlock/cache");
    assert_eq!(config.lock.key_prefix(), "lock");
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_select_for_update_with_defaults() {
    let yaml = r#"
lock:
  kind: select_for_update
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(
        config.lock,
        LockConfig::SelectForUpdate {
            nowait: true,
            attempts: 5
        }
    );
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
lock:
  kind: cache_lock
  attempts: 3
  expires_secs: 60
  key_prefix: billing-lock
cache_dir: /var/run/flowlock
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(
        config.lock,
        LockConfig::CacheLock {
            attempts: 3,
            expires_secs: 60,
            key_prefix: "billing-lock".to_string(),
        }
    );
    assert_eq!(config.lock.key_prefix(), "billing-lock");
    assert_eq!(config.cache_dir, "/var/run/flowlock");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
lock:
  kind: select_for_update
  nowait: false
  isolation: serializable
future_setting: 42
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(
        config.lock,
        LockConfig::SelectForUpdate {
            nowait: false,
            attempts: 5
        }
    );
}

#[test]
fn test_unknown_lock_kind_fails() {
    let yaml = r#"
lock:
  kind: advisory
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, FlowLockError::Config(_)));
    assert!(err.to_string().contains("failed to parse config YAML"));
}

#[test]
fn test_validate_attempts_must_be_positive() {
    let yaml = r#"
lock:
  kind: select_for_update
  attempts: 0
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("lock.attempts"));
}

#[test]
fn test_validate_expires_must_be_positive() {
    let yaml = r#"
lock:
  kind: cache_lock
  expires_secs: 0
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("lock.expires_secs"));
}

#[test]
fn test_validate_expires_is_capped() {
    let yaml = r#"
lock:
  kind: cache_lock
  expires_secs: 10000000000000
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("at most"));

    let one_year = LockConfig::CacheLock {
        attempts: 5,
        expires_secs: crate::config::types::MAX_EXPIRES_SECS,
        key_prefix: "lock".to_string(),
    };
    assert!(one_year.validate().is_ok());
}

#[test]
fn test_validate_key_prefix() {
    let empty = LockConfig::CacheLock {
        attempts: 5,
        expires_secs: 120,
        key_prefix: String::new(),
    };
    assert!(empty.validate().is_err());

    let slashed = LockConfig::CacheLock {
        attempts: 5,
        expires_secs: 120,
        key_prefix: "a/b".to_string(),
    };
    let err = slashed.validate().unwrap_err();
    assert!(err.to_string().contains("must not contain '/'"));
}

#[test]
fn test_validate_cache_dir_non_empty() {
    let err = Config::from_yaml("cache_dir: \"  \"").unwrap_err();
    assert!(err.to_string().contains("cache_dir"));
}

#[test]
fn test_yaml_round_trip() {
    let config = Config {
        lock: LockConfig::CacheLock {
            attempts: 2,
            expires_secs: 30,
            key_prefix: "lock".to_string(),
        },
        cache_dir: "locks".to_string(),
    };

    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("kind: cache_lock"));
    assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.yaml");
    std::fs::write(&path, "lock:\n  kind: no_lock\ncache_dir: c\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.cache_dir, "c");

    let err = Config::load(temp_dir.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_resolve_prefers_explicit_then_default_file() {
    let temp_dir = TempDir::new().unwrap();

    // Nothing on disk: defaults
    let config = Config::resolve(None, temp_dir.path()).unwrap();
    assert_eq!(config, Config::default());

    // flowlock.yaml in the working directory
    std::fs::write(
        temp_dir.path().join(DEFAULT_CONFIG_FILE),
        "lock:\n  kind: select_for_update\n",
    )
    .unwrap();
    let config = Config::resolve(None, temp_dir.path()).unwrap();
    assert!(matches!(config.lock, LockConfig::SelectForUpdate { .. }));

    // Explicit path wins and must exist
    let explicit = temp_dir.path().join("other.yaml");
    assert!(Config::resolve(Some(&explicit), temp_dir.path()).is_err());
    std::fs::write(&explicit, "cache_dir: elsewhere\n").unwrap();
    let config = Config::resolve(Some(&explicit), temp_dir.path()).unwrap();
    assert_eq!(config.cache_dir, "elsewhere");
}

#[test]
fn test_cache_dir_resolution() {
    let config = Config::default();
    assert_eq!(
        config.cache_dir_in(Path::new("/srv/app")),
        Path::new("/srv/app/.flowlock/cache")
    );

    let config = Config {
        cache_dir: "/tmp/locks".to_string(),
        ..Config::default()
    };
    assert_eq!(config.cache_dir_in(Path::new("/srv/app")), Path::new("/tmp/locks"));
}
