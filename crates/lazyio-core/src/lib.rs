//! # lazyio-core
//!
//! Building blocks for switching CephFS file descriptors into Lazy I/O mode.
//!
//! The preload library and the `lazyio` CLI share this crate so that the
//! decision "does this freshly opened file qualify?" and the exact log line
//! shapes live in one place and can be tested without interposing anything.

pub mod ceph;
pub mod event;
pub mod policy;

pub use ceph::{CephLazyIo, ConsistencyControl, CEPH_IOCTL_MAGIC, CEPH_IOC_LAZYIO};
pub use event::{creation_mode, log_path_for_pid, InitOwner, LazyIoOutcome, OpenEvent};
pub use policy::{enable_lazy, Decision, DeclineReason, PrefixPolicy};

/// Absolute path prefix selecting files that are opened in Lazy I/O mode.
/// Unset means the relaxed-consistency path is disabled entirely.
pub const PREFIX_ENV: &str = "LAZYIO_CEPHFS_PREFIX";

/// Base path of the per-process diagnostic log. `.<pid>` is appended.
pub const LOG_ENV: &str = "LAZYIO_LOG";
