//! Injecting `liblazyio_preload.so` into a child process.

use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use lazyio_config::{log_cli_info, log_cli_warn, Config};

pub const LIBRARY_FILE: &str = "liblazyio_preload.so";
const LD_PRELOAD: &str = "LD_PRELOAD";

/// Replace the current process with `command`, preloaded.
///
/// Uses `exec`, so the command keeps this process's pid and the log file is
/// named after it.
pub fn cmd_run(config: &Config, command: &[OsString]) -> Result<()> {
    let (program, args) = command.split_first().context("No command given")?;
    let env = child_env(config, env::var_os(LD_PRELOAD))?;

    if config.cephfs.prefix.is_none() {
        log_cli_warn!("No CephFS prefix configured; opens will only be logged");
    }
    log_cli_info!(
        "Launching with preload",
        program = program.to_string_lossy().to_string()
    );

    let err = Command::new(program).args(args).envs(env).exec();
    Err(err).with_context(|| format!("Failed to execute {}", program.to_string_lossy()))
}

/// Print `export` lines for `eval`.
pub fn cmd_env(config: &Config) -> Result<()> {
    let env = child_env(config, env::var_os(LD_PRELOAD))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "# lazyio - CephFS Lazy I/O preload")?;
    for (key, value) in env {
        out.write_all(b"export ")?;
        out.write_all(key.as_bytes())?;
        out.write_all(b"=")?;
        out.write_all(&shell_quote(&value))?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Environment additions for the wrapped process: the preload variables plus
/// `LD_PRELOAD` with the library in front of whatever was already there.
pub fn child_env(config: &Config, existing: Option<OsString>) -> Result<Vec<(OsString, OsString)>> {
    let library = find_preload_library(config)?;
    let mut env: Vec<(OsString, OsString)> = config
        .preload_env()
        .into_iter()
        .map(|(k, v)| (OsString::from(k), v))
        .collect();
    env.push((
        OsString::from(LD_PRELOAD),
        ld_preload_value(&library, existing.as_deref()),
    ));
    Ok(env)
}

/// `library` first, followed by the existing entries minus any duplicate.
pub fn ld_preload_value(library: &Path, existing: Option<&OsStr>) -> OsString {
    let lib = library.as_os_str().as_bytes();
    let mut value = lib.to_vec();
    if let Some(existing) = existing {
        // ld.so accepts both spaces and colons as separators
        for entry in existing
            .as_bytes()
            .split(|b| *b == b':' || *b == b' ')
            .filter(|e| !e.is_empty() && *e != lib)
        {
            value.push(b':');
            value.extend_from_slice(entry);
        }
    }
    OsString::from_vec(value)
}

/// Locate the preload library: explicit config first, then the install
/// layout next to the executable, then cargo's target directory.
pub fn find_preload_library(config: &Config) -> Result<PathBuf> {
    if let Some(explicit) = &config.preload.library {
        if explicit.is_file() {
            return explicit
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", explicit.display()));
        }
        bail!("Preload library not found: {}", explicit.display());
    }

    // Check relative to executable
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            // Same directory as lazyio binary
            let sibling = exe_dir.join(LIBRARY_FILE);
            if sibling.is_file() {
                return Ok(sibling);
            }

            // ../lib/ relative to bin/
            if let Some(prefix) = exe_dir.parent() {
                let lib_path = prefix.join("lib").join(LIBRARY_FILE);
                if lib_path.is_file() {
                    return Ok(lib_path);
                }
            }
        }
    }

    // Check cargo target directory (development mode)
    for profile in ["debug", "release"] {
        let candidate = Path::new("target").join(profile).join(LIBRARY_FILE);
        if candidate.is_file() {
            return candidate.canonicalize().context("resolve target path");
        }
    }

    bail!(
        "Could not find {}. Build it with 'cargo build -p lazyio-preload' or pass --library.",
        LIBRARY_FILE
    )
}

/// POSIX single-quote quoting, byte exact.
fn shell_quote(value: &OsStr) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 2);
    out.push(b'\'');
    for &b in value.as_bytes() {
        if b == b'\'' {
            out.extend_from_slice(b"'\\''");
        } else {
            out.push(b);
        }
    }
    out.push(b'\'');
    out
}
