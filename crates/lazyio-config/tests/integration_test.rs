//! Integration tests for lazyio-config
//!
//! These tests verify the full config loading pipeline with real file system operations.

use std::ffi::OsString;
use std::path::PathBuf;
use tempfile::tempdir;

use lazyio_config::{Config, ConfigError, LIBRARY_ENV, LOG_ENV, PREFIX_ENV};

fn no_env(_: &str) -> Option<OsString> {
    None
}

/// Test config loading from real global config file
#[test]
fn test_load_global_config_from_file() {
    let temp = tempdir().unwrap();
    let global = temp.path().join("global.toml");
    std::fs::write(
        &global,
        r#"
[cephfs]
prefix = "/mnt/cephfs"

[log]
base = "/var/tmp/lazyio.log"
"#,
    )
    .unwrap();

    let config =
        Config::load_from(Some(&global), &temp.path().join("missing.toml"), no_env).unwrap();

    assert_eq!(config.cephfs.prefix, Some(PathBuf::from("/mnt/cephfs")));
    assert_eq!(config.log.base, Some(PathBuf::from("/var/tmp/lazyio.log")));
    assert!(config.preload.library.is_none());
}

/// Test config hierarchy: project config overrides global
#[test]
fn test_config_hierarchy_project_overrides_global() {
    let temp = tempdir().unwrap();

    let global = temp.path().join("global.toml");
    std::fs::write(
        &global,
        r#"
[cephfs]
prefix = "/mnt/cephfs"

[log]
base = "/var/tmp/lazyio.log"
"#,
    )
    .unwrap();

    let project = temp.path().join("project.toml");
    std::fs::write(
        &project,
        r#"
[cephfs]
prefix = "/mnt/cephfs/scratch"
"#,
    )
    .unwrap();

    let config = Config::load_from(Some(&global), &project, no_env).unwrap();

    assert_eq!(
        config.cephfs.prefix,
        Some(PathBuf::from("/mnt/cephfs/scratch"))
    );
    // Untouched by the project file
    assert_eq!(config.log.base, Some(PathBuf::from("/var/tmp/lazyio.log")));
}

/// Test environment variables win over both files
#[test]
fn test_env_overrides_files() {
    let temp = tempdir().unwrap();
    let project = temp.path().join("project.toml");
    std::fs::write(
        &project,
        r#"
[cephfs]
prefix = "/mnt/cephfs"

[preload]
library = "/opt/lazyio/liblazyio_preload.so"
"#,
    )
    .unwrap();

    let env = |key: &str| match key {
        k if k == PREFIX_ENV => Some(OsString::from("/mnt/other")),
        k if k == LOG_ENV => Some(OsString::from("/tmp/job.log")),
        _ => None,
    };
    let config = Config::load_from(None, &project, env).unwrap();

    assert_eq!(config.cephfs.prefix, Some(PathBuf::from("/mnt/other")));
    assert_eq!(config.log.base, Some(PathBuf::from("/tmp/job.log")));
    assert_eq!(
        config.preload.library,
        Some(PathBuf::from("/opt/lazyio/liblazyio_preload.so"))
    );
}

#[test]
fn test_library_env_override() {
    let temp = tempdir().unwrap();
    let env = |key: &str| (key == LIBRARY_ENV).then(|| OsString::from("/custom/lib.so"));
    let config = Config::load_from(None, &temp.path().join("none.toml"), env).unwrap();
    assert_eq!(config.preload.library, Some(PathBuf::from("/custom/lib.so")));
}

/// No files and no env: everything disabled
#[test]
fn test_load_nothing_gives_default() {
    let temp = tempdir().unwrap();
    let config = Config::load_from(
        Some(&temp.path().join("a.toml")),
        &temp.path().join("b.toml"),
        no_env,
    )
    .unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_project_config_is_an_error() {
    let temp = tempdir().unwrap();
    let project = temp.path().join("project.toml");
    std::fs::write(&project, "[cephfs\nprefix = ").unwrap();

    let err = Config::load_from(None, &project, no_env).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_effective_config_roundtrips_through_toml() {
    let temp = tempdir().unwrap();
    let env = |key: &str| match key {
        k if k == PREFIX_ENV => Some(OsString::from("/mnt/cephfs")),
        _ => None,
    };
    let config = Config::load_from(None, &temp.path().join("none.toml"), env).unwrap();

    let written = temp.path().join("written.toml");
    std::fs::write(&written, config.to_toml().unwrap()).unwrap();
    assert_eq!(Config::from_file(&written).unwrap(), config);
}
