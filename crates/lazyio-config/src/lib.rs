//! # lazyio-config
//!
//! Configuration management for lazyio.
//!
//! Loads configuration from:
//! 1. `~/.lazyio/config.toml` (global)
//! 2. `.lazyio/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)
//!
//! The preload library itself only ever looks at the environment; this
//! layering exists for the `lazyio` launcher, which turns the effective
//! config back into environment variables for the wrapped process.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[macro_use]
pub mod logging;
pub mod testing;

pub use lazyio_core::{LOG_ENV, PREFIX_ENV};

#[doc(hidden)]
pub use tracing;

/// Explicit location of `liblazyio_preload.so` for the launcher.
pub const LIBRARY_ENV: &str = "LAZYIO_LIBRARY";

/// Project config path, relative to the working directory.
pub const PROJECT_CONFIG: &str = ".lazyio/config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cephfs: CephfsConfig,
    pub log: LogConfig,
    pub preload: PreloadConfig,
}

/// Which files get Lazy I/O
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CephfsConfig {
    /// Literal byte prefix of canonical paths (`LAZYIO_CEPHFS_PREFIX`).
    /// Unset leaves the preload library as a pure logging pass-through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PathBuf>,
}

/// Per-process diagnostic log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base path; each process writes `<base>.<pid>` (`LAZYIO_LOG`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Path to `liblazyio_preload.so` (`LAZYIO_LIBRARY`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(
            Self::global_config_path().as_deref(),
            Path::new(PROJECT_CONFIG),
            |key| std::env::var_os(key),
        )
    }

    /// Layer `global`, then `project`, then whatever `env` reports.
    /// Missing files are skipped; unreadable or malformed ones are errors.
    pub fn load_from<F>(global: Option<&Path>, project: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Config::default();

        // 1. Load global config (~/.lazyio/config.toml)
        if let Some(global_path) = global {
            if global_path.exists() {
                log_config_debug!("Loading global config", path = global_path.display().to_string());
                config = Self::from_file(global_path)?;
            }
        }

        // 2. Load project config (.lazyio/config.toml) - overrides global
        if project.exists() {
            log_config_debug!("Loading project config", path = project.display().to_string());
            config.merge(Self::from_file(project)?);
        }

        // 3. Apply environment variable overrides
        config.apply_env_overrides(env);

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Global config path: ~/.lazyio/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lazyio/config.toml"))
    }

    /// Project values replace global ones field by field
    fn merge(&mut self, other: Config) {
        if other.cephfs.prefix.is_some() {
            self.cephfs.prefix = other.cephfs.prefix;
        }
        if other.log.base.is_some() {
            self.log.base = other.log.base;
        }
        if other.preload.library.is_some() {
            self.preload.library = other.preload.library;
        }
    }

    /// Apply environment variable overrides. A variable that is set but empty
    /// still wins: an empty prefix is a valid (match-everything) setting.
    fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(prefix) = env(PREFIX_ENV) {
            self.cephfs.prefix = Some(PathBuf::from(prefix));
        }
        if let Some(base) = env(LOG_ENV) {
            self.log.base = Some(PathBuf::from(base));
        }
        if let Some(library) = env(LIBRARY_ENV) {
            self.preload.library = Some(PathBuf::from(library));
        }
    }

    /// Variables the preload library reads in the wrapped process.
    /// Unset settings are omitted, not exported empty.
    pub fn preload_env(&self) -> Vec<(&'static str, OsString)> {
        let mut vars = Vec::new();
        if let Some(prefix) = &self.cephfs.prefix {
            vars.push((PREFIX_ENV, prefix.clone().into_os_string()));
        }
        if let Some(base) = &self.log.base {
            vars.push((LOG_ENV, base.clone().into_os_string()));
        }
        vars
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        concat!(
            "[cephfs]\n",
            "# prefix = \"/mnt/cephfs\"\n",
            "\n",
            "[log]\n",
            "# base = \"/tmp/lazyio.log\"\n",
            "\n",
            "[preload]\n",
            "# library = \"/usr/local/lib/liblazyio_preload.so\"\n",
        )
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_disabled() {
        let config = Config::default();
        assert!(config.cephfs.prefix.is_none());
        assert!(config.log.base.is_none());
        assert!(config.preload_env().is_empty());
    }

    #[test]
    fn test_default_toml_parses_to_default() {
        let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let parsed: Config = toml::from_str(
            r#"
[cephfs]
prefix = "/mnt/cephfs"

[log]
base = "/tmp/lazyio.log"

[preload]
library = "/opt/lazyio/liblazyio_preload.so"
"#,
        )
        .unwrap();
        assert_eq!(parsed.cephfs.prefix, Some(PathBuf::from("/mnt/cephfs")));
        assert_eq!(parsed.log.base, Some(PathBuf::from("/tmp/lazyio.log")));
        assert_eq!(
            parsed.preload.library,
            Some(PathBuf::from("/opt/lazyio/liblazyio_preload.so"))
        );
    }

    #[test]
    fn test_env_overrides_everything() {
        let mut config = Config::default();
        config.cephfs.prefix = Some(PathBuf::from("/mnt/from-file"));
        config.apply_env_overrides(env_from(&[
            (PREFIX_ENV, "/mnt/cephfs"),
            (LOG_ENV, "/tmp/run.log"),
        ]));
        assert_eq!(config.cephfs.prefix, Some(PathBuf::from("/mnt/cephfs")));
        assert_eq!(config.log.base, Some(PathBuf::from("/tmp/run.log")));
        assert!(config.preload.library.is_none());
    }

    #[test]
    fn test_empty_env_prefix_is_kept() {
        let mut config = Config::default();
        config.apply_env_overrides(env_from(&[(PREFIX_ENV, "")]));
        assert_eq!(config.cephfs.prefix, Some(PathBuf::new()));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut base = Config::default();
        base.cephfs.prefix = Some(PathBuf::from("/mnt/global"));
        base.log.base = Some(PathBuf::from("/var/log/lazyio"));

        let mut project = Config::default();
        project.cephfs.prefix = Some(PathBuf::from("/mnt/project"));

        base.merge(project);
        assert_eq!(base.cephfs.prefix, Some(PathBuf::from("/mnt/project")));
        assert_eq!(base.log.base, Some(PathBuf::from("/var/log/lazyio")));
    }

    #[test]
    fn test_preload_env_names() {
        let mut config = Config::default();
        config.cephfs.prefix = Some(PathBuf::from("/mnt/cephfs"));
        config.log.base = Some(PathBuf::from("/tmp/lazyio.log"));
        let env = config.preload_env();
        assert_eq!(
            env,
            vec![
                ("LAZYIO_CEPHFS_PREFIX", OsString::from("/mnt/cephfs")),
                ("LAZYIO_LOG", OsString::from("/tmp/lazyio.log")),
            ]
        );
    }

    #[test]
    fn test_to_toml_skips_unset() {
        let mut config = Config::default();
        config.cephfs.prefix = Some(PathBuf::from("/mnt/cephfs"));
        let out = config.to_toml().unwrap();
        assert!(out.contains("prefix = \"/mnt/cephfs\""));
        assert!(!out.contains("library"));
    }
}
