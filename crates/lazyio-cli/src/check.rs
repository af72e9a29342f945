//! `lazyio check`: dry run of the prefix policy. Never issues the ioctl.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;
use lazyio_config::{log_cli_debug, PREFIX_ENV};
use lazyio_core::{Decision, DeclineReason, PrefixPolicy};

pub fn cmd_check(prefix: Option<PathBuf>, paths: &[PathBuf]) -> Result<()> {
    let Some(prefix) = prefix else {
        println!(
            "{} {} is not set; every open is a pass-through",
            style("disabled:").yellow(),
            PREFIX_ENV
        );
        return Ok(());
    };

    log_cli_debug!("Checking paths", count = paths.len());
    let policy = PrefixPolicy::new(prefix);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for path in paths {
        writeln!(out, "{}", describe(&policy, path))?;
    }
    Ok(())
}

/// One report line per path
pub fn describe(policy: &PrefixPolicy, path: &Path) -> String {
    match policy.decide(path) {
        Decision::Apply(canonical) => format!(
            "{} {} -> {}",
            style("LAZY").green().bold(),
            path.display(),
            canonical.display()
        ),
        Decision::Decline(DeclineReason::OutsidePrefix) => format!(
            "{} {} (outside prefix)",
            style("SKIP").dim(),
            path.display()
        ),
        Decision::Decline(DeclineReason::Unresolvable(kind)) => format!(
            "{} {} (unresolvable: {})",
            style("SKIP").dim(),
            path.display(),
            kind
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyio_config::testing::TestEnvironment;

    #[test]
    fn test_describe_each_decision() {
        console::set_colors_enabled(false);
        let env = TestEnvironment::new().unwrap();
        let inside = env.mount_file("data/file.txt", b"x").unwrap();
        let outside = env.outside_file("file.txt", b"x").unwrap();
        let policy = PrefixPolicy::new(env.mount_root.clone());

        assert_eq!(
            describe(&policy, &inside),
            format!("LAZY {} -> {}", inside.display(), inside.display())
        );
        assert_eq!(
            describe(&policy, &outside),
            format!("SKIP {} (outside prefix)", outside.display())
        );
        assert!(describe(&policy, &env.mount_root.join("missing"))
            .starts_with("SKIP "));
    }
}
