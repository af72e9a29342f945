use libc::c_int;
use std::ffi::{CStr, OsStr};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use lazyio_core::{CephLazyIo, PrefixPolicy};

/// Issue `CEPH_IOC_LAZYIO` on `fd` if `path` canonicalizes under
/// `LAZYIO_CEPHFS_PREFIX`, logging the ioctl result either way.
///
/// Returns the ioctl result, or 0 when the file does not qualify. The prefix
/// is re-read from the environment on every call.
pub(crate) fn enable_lazy(path: &CStr, fd: RawFd) -> c_int {
    let policy = PrefixPolicy::from_env();
    let path = Path::new(OsStr::from_bytes(path.to_bytes()));

    match lazyio_core::enable_lazy(policy.as_ref(), path, fd, &CephLazyIo) {
        Some(outcome) => {
            preload_log!(outcome);
            outcome.result
        }
        None => 0,
    }
}
