//! Prefix policy: which freshly opened files get Lazy I/O.
//!
//! The decision is made on the canonical form of the path the caller passed
//! to `open`, compared byte-for-byte against the configured prefix. The match
//! is deliberately not path-segment aware: a prefix of `/mnt/ceph` accepts
//! `/mnt/cephfs/x` as well as `/mnt/ceph/x`.

use std::ffi::{OsStr, OsString};
use std::io;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::ceph::ConsistencyControl;
use crate::event::LazyIoOutcome;
use crate::PREFIX_ENV;

/// Literal byte prefix selecting CephFS files for Lazy I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixPolicy {
    prefix: OsString,
}

/// Outcome of evaluating one path against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Canonical path lies under the prefix.
    Apply(PathBuf),
    Decline(DeclineReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// The path could not be canonicalized (missing, not a directory, ...).
    Unresolvable(io::ErrorKind),
    OutsidePrefix,
}

impl PrefixPolicy {
    pub fn new(prefix: impl Into<OsString>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Read the policy from `LAZYIO_CEPHFS_PREFIX`.
    ///
    /// Not cached: every call observes the current environment.
    pub fn from_env() -> Option<Self> {
        Self::from_var(std::env::var_os(PREFIX_ENV))
    }

    /// Build from an already fetched variable value. `None` disables the policy,
    /// while an empty value is a zero-length prefix that matches everything.
    pub fn from_var(value: Option<OsString>) -> Option<Self> {
        value.map(Self::new)
    }

    pub fn prefix(&self) -> &OsStr {
        &self.prefix
    }

    /// Byte-prefix test against an already canonical path.
    pub fn matches(&self, canonical: &Path) -> bool {
        canonical
            .as_os_str()
            .as_bytes()
            .starts_with(self.prefix.as_bytes())
    }

    /// Canonicalize `path` (relative to the current directory, following
    /// symlinks) and test it against the prefix.
    pub fn decide(&self, path: &Path) -> Decision {
        match std::fs::canonicalize(path) {
            Ok(canonical) if self.matches(&canonical) => Decision::Apply(canonical),
            Ok(_) => Decision::Decline(DeclineReason::OutsidePrefix),
            Err(e) => Decision::Decline(DeclineReason::Unresolvable(e.kind())),
        }
    }
}

impl Decision {
    pub fn is_apply(&self) -> bool {
        matches!(self, Decision::Apply(_))
    }
}

/// Apply Lazy I/O to `fd` when `path` qualifies under `policy`.
///
/// Returns `None` when the policy is disabled or declines; otherwise the
/// control has been invoked exactly once and its raw result is returned.
/// A negative result is only informational: the open already succeeded.
pub fn enable_lazy<C: ConsistencyControl + ?Sized>(
    policy: Option<&PrefixPolicy>,
    path: &Path,
    fd: RawFd,
    control: &C,
) -> Option<LazyIoOutcome> {
    let policy = policy?;
    if !policy.decide(path).is_apply() {
        return None;
    }
    Some(LazyIoOutcome {
        fd,
        request: control.request(),
        result: control.relax(fd),
    })
}
