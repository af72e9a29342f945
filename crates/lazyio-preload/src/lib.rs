//! # lazyio-preload
//!
//! LD_PRELOAD library that switches CephFS files into Lazy I/O mode as they are
//! opened, without touching the host application.
//!
//! Exported symbols: `open`, `open64`, `__open`, `__open64`. Each one forwards
//! to the next definition in the link chain, logs the call, and on success asks
//! the prefix policy whether to issue `CEPH_IOC_LAZYIO` on the new descriptor.
//!
//! ```bash
//! LAZYIO_CEPHFS_PREFIX=/mnt/cephfs LAZYIO_LOG=/tmp/lazyio \
//!     LD_PRELOAD=target/release/liblazyio_preload.so ./app
//! ```
//!
//! Nothing in here may call the interposed entry points on its own behalf:
//! the log file is opened through the resolved real `open`, and every line
//! goes out through a single raw `write(2)`.

// CephFS and the exported glibc aliases only exist on Linux
#![cfg(target_os = "linux")]
// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

// Macros must be defined before modules that use them
#[macro_use]
pub mod macros;

pub mod interpose;
pub mod policy;
pub mod reals;
pub mod state;
pub mod syscalls;

use libc::c_int;

#[inline]
pub(crate) fn get_errno() -> c_int {
    unsafe { *libc::__errno_location() }
}

#[inline]
pub(crate) fn set_errno(e: c_int) {
    unsafe { *libc::__errno_location() = e };
}

/// errno as left by the authentic call, put back before the interposer returns.
pub(crate) struct SavedErrno(c_int);

impl SavedErrno {
    #[inline]
    pub(crate) fn capture() -> Self {
        Self(get_errno())
    }
}

impl Drop for SavedErrno {
    fn drop(&mut self) {
        set_errno(self.0);
    }
}
