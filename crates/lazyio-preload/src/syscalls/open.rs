use libc::{c_char, c_int, c_uint, mode_t};
use std::ffi::CStr;

use lazyio_core::{creation_mode, OpenEvent};

use crate::reals::RealSymbol;
use crate::state::InterposerGuard;
use crate::SavedErrno;

/// Shared body of the four open-family interposers.
///
/// The caller always sees exactly what the authentic call produced: the same
/// descriptor or `-1`, and the same errno. Logging and the Lazy I/O ioctl run
/// in between and are never allowed to leak into either.
pub(crate) unsafe fn open_impl(
    entry: &'static str,
    real: &RealSymbol,
    path: *const c_char,
    flags: c_int,
    raw_mode: mode_t,
) -> c_int {
    // Only meaningful for O_CREAT / O_TMPFILE; anything else is an unset slot
    let mode = creation_mode(flags, raw_mode).unwrap_or(0);

    let real_open = real.open_fn();
    let fd = real_open(path, flags, mode as c_uint);
    let _errno = SavedErrno::capture();

    let _guard = match InterposerGuard::enter() {
        Some(g) => g,
        None => return fd,
    };

    let path = if path.is_null() {
        None
    } else {
        Some(CStr::from_ptr(path))
    };

    preload_log!(OpenEvent {
        entry,
        path: path.map_or(&b"(null)"[..], |p| p.to_bytes()),
        flags,
        mode,
        fd,
    });

    if fd >= 0 {
        if let Some(path) = path {
            // Result is logged inside; a refused ioctl never fails the open
            crate::policy::enable_lazy(path, fd);
        }
    }

    fd
}
