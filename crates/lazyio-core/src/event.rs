//! Diagnostic log line shapes.
//!
//! One line per event, plain text, no framing:
//!
//! ```text
//! open("/mnt/cephfs/data/file.txt", 0x0, 0) -> 3
//! ceph_ioctl_lazyio(3, 38660) -> 0
//! ```
//!
//! Writers take any `io::Write` so the preload library can render into a
//! stack buffer and emit each line with a single `write(2)`.

use libc::{c_int, mode_t};
use std::ffi::OsStr;
use std::io::{self, Write};
use std::os::fd::RawFd;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

/// One intercepted open-family call.
#[derive(Debug, Clone, Copy)]
pub struct OpenEvent<'a> {
    /// Exported symbol the caller went through (`open`, `__open64`, ...).
    pub entry: &'a str,
    /// Path exactly as the caller passed it. Not required to be UTF-8.
    pub path: &'a [u8],
    pub flags: c_int,
    pub mode: mode_t,
    /// Descriptor or negative error indicator from the authentic call.
    pub fd: c_int,
}

/// Result of one relaxed-consistency control invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazyIoOutcome {
    pub fd: RawFd,
    pub request: libc::Ioctl,
    pub result: c_int,
}

impl OpenEvent<'_> {
    pub fn write_line<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}(\"", self.entry)?;
        w.write_all(self.path)?;
        writeln!(
            w,
            "\", 0x{:x}, {:o}) -> {}",
            self.flags as u32, self.mode, self.fd
        )
    }
}

impl LazyIoOutcome {
    pub fn write_line<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "ceph_ioctl_lazyio({}, {}) -> {}",
            self.fd, self.request, self.result
        )
    }
}

/// `<base>.<pid>`: one log file per process so parallel ranks never share one.
pub fn log_path_for_pid(base: &OsStr, pid: u32) -> PathBuf {
    let mut bytes = base.as_bytes().to_vec();
    // Cannot fail writing into a Vec.
    let _ = write!(bytes, ".{}", pid);
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

/// The creation mode carried by an open call, if its flags make it meaningful.
///
/// `open` only reads its third argument for `O_CREAT` and `O_TMPFILE`; for
/// every other call the slot holds whatever the caller left there.
pub fn creation_mode(flags: c_int, raw: mode_t) -> Option<mode_t> {
    let creates = flags & libc::O_CREAT != 0 || flags & libc::O_TMPFILE == libc::O_TMPFILE;
    creates.then_some(raw)
}

/// Pid of the process that started opening the log stream.
///
/// `fork` copies an initialization that another thread had in flight, but
/// not that thread, so a child would wait on it forever. The child sees a
/// foreign owner here and runs without a log instead.
#[derive(Debug, Default)]
pub struct InitOwner(AtomicU32);

impl InitOwner {
    pub const fn new() -> Self {
        InitOwner(AtomicU32::new(0))
    }

    /// True when `pid` may run (or wait on) the one-time initialization.
    pub fn claim(&self, pid: u32) -> bool {
        match self
            .0
            .compare_exchange(0, pid, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(owner) => owner == pid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_open(event: OpenEvent<'_>) -> String {
        let mut out = Vec::new();
        event.write_line(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_open_line_shape() {
        let line = render_open(OpenEvent {
            entry: "open",
            path: b"/mnt/cephfs/data/file.txt",
            flags: 0,
            mode: 0,
            fd: 3,
        });
        assert_eq!(line, "open(\"/mnt/cephfs/data/file.txt\", 0x0, 0) -> 3\n");
    }

    #[test]
    fn test_open_line_hex_flags_and_octal_mode() {
        let line = render_open(OpenEvent {
            entry: "__open64",
            path: b"out.dat",
            flags: libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            mode: 0o644,
            fd: -1,
        });
        let expected_flags = (libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC) as u32;
        assert_eq!(
            line,
            format!("__open64(\"out.dat\", 0x{:x}, 644) -> -1\n", expected_flags)
        );
    }

    #[test]
    fn test_open_line_keeps_raw_path_bytes() {
        let mut out = Vec::new();
        OpenEvent {
            entry: "open64",
            path: b"/data/\xffbin",
            flags: 0,
            mode: 0,
            fd: 4,
        }
        .write_line(&mut out)
        .unwrap();
        assert_eq!(out, b"open64(\"/data/\xffbin\", 0x0, 0) -> 4\n");
    }

    #[test]
    fn test_lazyio_line_shape() {
        let outcome = LazyIoOutcome {
            fd: 3,
            request: crate::CEPH_IOC_LAZYIO,
            result: 0,
        };
        let mut out = Vec::new();
        outcome.write_line(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("ceph_ioctl_lazyio(3, {}) -> 0\n", crate::CEPH_IOC_LAZYIO)
        );
    }

    #[test]
    fn test_log_path_appends_pid() {
        let path = log_path_for_pid(OsStr::new("/tmp/lazyio.log"), 4242);
        assert_eq!(path, PathBuf::from("/tmp/lazyio.log.4242"));
    }

    #[test]
    fn test_creation_mode_only_with_create_flags() {
        assert_eq!(creation_mode(libc::O_RDONLY, 0o755), None);
        assert_eq!(creation_mode(libc::O_WRONLY | libc::O_APPEND, 0o600), None);
        assert_eq!(
            creation_mode(libc::O_WRONLY | libc::O_CREAT, 0o600),
            Some(0o600)
        );
        assert_eq!(
            creation_mode(libc::O_RDWR | libc::O_TMPFILE, 0o600),
            Some(0o600)
        );
    }

    #[test]
    fn test_creation_mode_directory_flag_alone_is_not_tmpfile() {
        // O_TMPFILE includes the O_DIRECTORY bit
        assert_eq!(creation_mode(libc::O_DIRECTORY, 0o700), None);
    }

    #[test]
    fn test_init_owner_first_claim_wins() {
        let owner = InitOwner::new();
        assert!(owner.claim(100));
        // Other threads of the same process wait on the same initialization
        assert!(owner.claim(100));
    }

    #[test]
    fn test_init_owner_rejects_forked_child() {
        let owner = InitOwner::new();
        assert!(owner.claim(100));
        assert!(!owner.claim(101));
    }

    #[test]
    fn test_init_owner_claimed_concurrently_once() {
        let owner = std::sync::Arc::new(InitOwner::new());
        let handles: Vec<_> = (1..=8u32)
            .map(|pid| {
                let owner = owner.clone();
                std::thread::spawn(move || owner.claim(pid))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
