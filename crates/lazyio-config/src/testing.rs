//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - A stand-in "CephFS mount" directory (canonical, so prefix checks hold)
//! - A sibling directory that must never qualify
//! - A per-test log base for the preload library
//!
//! # Usage
//!
//! ```ignore
//! use lazyio_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     let file = env.mount_file("data/file.txt", b"payload").unwrap();
//!     // run something with env.preload_config() ...
//! }
//! ```

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use crate::Config;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Canonical root of all test paths
    pub root: PathBuf,
    /// Directory playing the CephFS mount
    pub mount_root: PathBuf,
    /// Directory outside the prefix
    pub outside_root: PathBuf,
    /// `LAZYIO_LOG` value; files appear as `<log_base>.<pid>`
    pub log_base: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        // /tmp may itself be a symlink; prefixes compare canonical paths
        let root = temp_dir.path().canonicalize()?;

        let mount_root = root.join("cephfs");
        let outside_root = root.join("scratch");
        let log_dir = root.join("logs");

        std::fs::create_dir_all(&mount_root)?;
        std::fs::create_dir_all(&outside_root)?;
        std::fs::create_dir_all(&log_dir)?;

        let log_base = log_dir.join(format!("lazyio-{}.log", test_id));

        Ok(Self {
            _temp_dir: temp_dir,
            root,
            mount_root,
            outside_root,
            log_base,
            test_id,
        })
    }

    /// Create a file under the mount root, including parent directories
    pub fn mount_file(&self, rel: impl AsRef<Path>, contents: &[u8]) -> anyhow::Result<PathBuf> {
        write_file(&self.mount_root.join(rel), contents)
    }

    /// Create a file outside the mount root
    pub fn outside_file(&self, rel: impl AsRef<Path>, contents: &[u8]) -> anyhow::Result<PathBuf> {
        write_file(&self.outside_root.join(rel), contents)
    }

    /// Config pointing the prefix at `mount_root` and the log at `log_base`
    pub fn preload_config(&self) -> Config {
        let mut config = Config::default();
        config.cephfs.prefix = Some(self.mount_root.clone());
        config.log.base = Some(self.log_base.clone());
        config
    }

    /// Every `<log_base>.<pid>` file written so far, sorted
    pub fn log_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let dir = self
            .log_base
            .parent()
            .ok_or_else(|| anyhow::anyhow!("log base has no parent"))?;
        let mut stem = self
            .log_base
            .file_name()
            .map(|n| n.as_bytes().to_vec())
            .unwrap_or_default();
        stem.push(b'.');

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let name = path.file_name().unwrap_or(OsStr::new(""));
            if name.as_bytes().starts_with(&stem) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Concatenated contents of all log files
    pub fn log_contents(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        for file in self.log_files()? {
            out.push_str(&std::fs::read_to_string(file)?);
        }
        Ok(out)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(path.to_path_buf())
}
