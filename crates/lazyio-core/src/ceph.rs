//! CephFS Lazy I/O control operation.
//!
//! Normally Ceph switches to synchronous I/O when several clients hold a file
//! open and at least one of them writes: reads and writes bypass the page
//! cache and go straight to the OSDs. `CEPH_IOC_LAZYIO` lets a descriptor keep
//! using buffered I/O in that situation, trusting the application not to
//! depend on cross-client coherence.

use libc::c_int;
use std::os::fd::RawFd;

/// ioctl "type" byte reserved by the Ceph kernel client.
pub const CEPH_IOCTL_MAGIC: u8 = 0x97;

/// `_IO(CEPH_IOCTL_MAGIC, 4)`
pub const CEPH_IOC_LAZYIO: libc::Ioctl =
    nix::request_code_none!(CEPH_IOCTL_MAGIC, 4) as libc::Ioctl;

/// Applies relaxed consistency to an already-open descriptor.
///
/// Implementations return the raw result of the underlying control call:
/// zero or positive on success, negative when the filesystem refused it.
pub trait ConsistencyControl {
    /// Request code reported in the diagnostic log.
    fn request(&self) -> libc::Ioctl;

    fn relax(&self, fd: RawFd) -> c_int;
}

/// `ioctl(fd, CEPH_IOC_LAZYIO)` against the real kernel client.
#[derive(Debug, Default, Clone, Copy)]
pub struct CephLazyIo;

impl ConsistencyControl for CephLazyIo {
    fn request(&self) -> libc::Ioctl {
        CEPH_IOC_LAZYIO
    }

    fn relax(&self, fd: RawFd) -> c_int {
        unsafe { libc::ioctl(fd, CEPH_IOC_LAZYIO) }
    }
}
