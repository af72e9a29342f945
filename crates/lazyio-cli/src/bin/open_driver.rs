//! Test driver for the preload library.
//!
//! Calls the open family by symbol name so every interposed entry point can
//! be reached, whatever the host program would normally link against.
//!
//! ```text
//! lazyio-open-driver entries <PATH>...
//! lazyio-open-driver create <PATH> <MODE>
//! lazyio-open-driver threads <THREADS> <ROUNDS> <PATH>...
//! ```
//!
//! Each open prints `<entry> <path> <fd> <errno>` on stdout. The first line
//! is always `pid <pid>`.

use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStringExt;
use std::sync::{Arc, Barrier};

use anyhow::{bail, Context, Result};
use libc::{c_char, c_int, c_uint};

type OpenFn = unsafe extern "C" fn(*const c_char, c_int, ...) -> c_int;

const ENTRIES: [&str; 4] = ["open", "open64", "__open", "__open64"];

fn main() -> Result<()> {
    let mut args = std::env::args_os().skip(1);
    let command = args.next().context("missing command")?;
    let rest: Vec<OsString> = args.collect();

    println!("pid {}", std::process::id());
    match command.to_str() {
        Some("entries") => entries(&rest),
        Some("create") => create(&rest),
        Some("threads") => threads(&rest),
        _ => bail!("unknown command: {}", command.to_string_lossy()),
    }
}

fn c_path(path: &OsString) -> Result<CString> {
    CString::new(path.clone().into_vec()).context("path contains a NUL byte")
}

fn lookup(entry: &str) -> Result<Option<OpenFn>> {
    let name = CString::new(entry)?;
    let sym = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
    if sym.is_null() {
        return Ok(None);
    }
    Ok(Some(unsafe { std::mem::transmute::<*mut libc::c_void, OpenFn>(sym) }))
}

/// Open, report, close. errno is only meaningful on failure.
fn call(open: OpenFn, path: &CString, flags: c_int, mode: c_uint) -> (c_int, c_int) {
    unsafe {
        *libc::__errno_location() = 0;
        let fd = open(path.as_ptr(), flags, mode);
        let errno = if fd < 0 { *libc::__errno_location() } else { 0 };
        if fd >= 0 {
            libc::close(fd);
        }
        (fd, errno)
    }
}

fn entries(paths: &[OsString]) -> Result<()> {
    for entry in ENTRIES {
        let Some(open) = lookup(entry)? else {
            println!("{} missing", entry);
            continue;
        };
        for path in paths {
            let (fd, errno) = call(open, &c_path(path)?, libc::O_RDONLY, 0);
            println!("{} {} {} {}", entry, path.to_string_lossy(), fd, errno);
        }
    }
    Ok(())
}

fn create(args: &[OsString]) -> Result<()> {
    let [path, mode] = args else {
        bail!("usage: create <PATH> <MODE>");
    };
    let mode = mode
        .to_str()
        .and_then(|m| c_uint::from_str_radix(m, 8).ok())
        .context("mode must be octal")?;
    let open = lookup("open")?.context("open not found")?;
    let c_path = c_path(path)?;

    unsafe { libc::umask(0) };
    let (fd, errno) = call(open, &c_path, libc::O_WRONLY | libc::O_CREAT, mode);
    println!("open {} {} {}", path.to_string_lossy(), fd, errno);

    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    if unsafe { libc::stat(c_path.as_ptr(), &mut st) } == 0 {
        println!("mode {:o}", st.st_mode & 0o7777);
    }
    Ok(())
}

fn threads(args: &[OsString]) -> Result<()> {
    let [threads, rounds, paths @ ..] = args else {
        bail!("usage: threads <THREADS> <ROUNDS> <PATH>...");
    };
    let threads: usize = threads.to_string_lossy().parse().context("thread count")?;
    let rounds: usize = rounds.to_string_lossy().parse().context("round count")?;
    let paths = Arc::new(
        paths
            .iter()
            .map(c_path)
            .collect::<Result<Vec<_>>>()?,
    );

    // Every thread reaches its first open together
    let start = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let paths = paths.clone();
            let start = start.clone();
            std::thread::spawn(move || {
                start.wait();
                let mut failures = 0usize;
                for _ in 0..rounds {
                    for path in paths.iter() {
                        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDONLY) };
                        if fd < 0 {
                            failures += 1;
                        } else {
                            unsafe { libc::close(fd) };
                        }
                    }
                }
                failures
            })
        })
        .collect();

    let mut failures = 0;
    for handle in handles {
        failures += handle
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
    }
    println!("failures {}", failures);
    Ok(())
}
