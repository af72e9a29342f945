use libc::{c_int, c_uint, c_void};
use once_cell::sync::OnceCell;
use std::cell::Cell;
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStringExt;
use std::path::Path;

use lazyio_core::{log_path_for_pid, InitOwner, LOG_ENV};

use crate::macros::{StackWriter, LINE_BUF_SIZE};
use crate::reals::REAL_OPEN;

// ============================================================================
// Diagnostic log stream
// ============================================================================

/// Process-wide log destination, decided once on the first log attempt.
pub(crate) enum LogSink {
    /// `LAZYIO_LOG` is not set.
    Unconfigured,
    /// Opening `<base>.<pid>` failed; a warning went to stderr.
    Failed,
    Open(OwnedFd),
}

static LOG_SINK: OnceCell<LogSink> = OnceCell::new();
static LOG_SINK_OWNER: InitOwner = InitOwner::new();

const LOG_OPEN_FLAGS: c_int = libc::O_WRONLY | libc::O_APPEND | libc::O_CREAT | libc::O_CLOEXEC;
const LOG_MODE: c_uint = 0o666;

/// Concurrent first calls block on the cell until one thread has opened (or
/// given up on) the file, so the stream is opened at most once per process.
///
/// A child forked after the stream is open keeps writing to it. A child
/// forked while another thread was still opening it gets `None` for good.
pub(crate) fn log_sink() -> Option<&'static LogSink> {
    if let Some(sink) = LOG_SINK.get() {
        return Some(sink);
    }
    if !LOG_SINK_OWNER.claim(std::process::id()) {
        return None;
    }
    Some(LOG_SINK.get_or_init(open_log_sink))
}

fn open_log_sink() -> LogSink {
    let Some(base) = std::env::var_os(LOG_ENV) else {
        return LogSink::Unconfigured;
    };
    let path = log_path_for_pid(&base, std::process::id());

    match open_append(&path) {
        Ok(fd) => LogSink::Open(fd),
        Err(_) => {
            preload_stderr!("WARN: Could not open log file: {}", path.display());
            LogSink::Failed
        }
    }
}

/// Open through the authentic `open` so the log file itself is never
/// interposed, logged, or considered for Lazy I/O.
fn open_append(path: &Path) -> io::Result<OwnedFd> {
    let c_path = CString::new(path.as_os_str().to_os_string().into_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let fd = unsafe {
        let real_open = REAL_OPEN.open_fn();
        real_open(c_path.as_ptr(), LOG_OPEN_FLAGS, LOG_MODE)
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Append one line. Best effort: nothing is reported back to the caller.
///
/// The line is emitted with a single `write(2)` on an `O_APPEND` descriptor,
/// so concurrent writers interleave whole lines only.
pub(crate) fn log_line<F>(render: F)
where
    F: FnOnce(&mut StackWriter<'_>) -> io::Result<()>,
{
    let Some(LogSink::Open(fd)) = log_sink() else {
        return;
    };

    let mut buf = [0u8; LINE_BUF_SIZE];
    let mut writer = StackWriter::new(&mut buf);
    if render(&mut writer).is_err() {
        return;
    }
    writer.finish_line();

    let bytes = writer.as_bytes();
    unsafe {
        libc::write(fd.as_raw_fd(), bytes.as_ptr() as *const c_void, bytes.len());
    }
}

// ============================================================================
// Recursion guard
// ============================================================================

thread_local! {
    static IN_INTERPOSER: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside the interposer's bookkeeping. An open
/// issued from there (by realpath, another preload, ...) gets plain
/// passthrough instead of recursing into logging and policy again.
pub(crate) struct InterposerGuard(());

impl InterposerGuard {
    pub(crate) fn enter() -> Option<Self> {
        IN_INTERPOSER
            .try_with(|active| {
                if active.replace(true) {
                    None
                } else {
                    Some(InterposerGuard(()))
                }
            })
            // TLS already torn down on this thread
            .unwrap_or(None)
    }
}

impl Drop for InterposerGuard {
    fn drop(&mut self) {
        let _ = IN_INTERPOSER.try_with(|active| active.set(false));
    }
}
