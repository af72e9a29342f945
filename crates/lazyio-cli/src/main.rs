//! # lazyio CLI
//!
//! Launcher and inspection tool for the `liblazyio_preload.so` library.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lazyio_config::logging::{init_logging, LogLevel};
use lazyio_config::{Config, PROJECT_CONFIG};

mod check;
mod preload;

/// Enable CephFS Lazy I/O for unmodified programs
#[derive(Parser)]
#[command(name = "lazyio")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the effective config, highest priority
#[derive(Args, Debug, Clone, Default)]
struct PreloadArgs {
    /// Canonical path prefix whose files get Lazy I/O
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<PathBuf>,

    /// Log base path; each process writes <BASE>.<pid>
    #[arg(long, value_name = "BASE")]
    log: Option<PathBuf>,

    /// Path to liblazyio_preload.so
    #[arg(long, value_name = "LIB")]
    library: Option<PathBuf>,
}

impl PreloadArgs {
    fn apply(self, config: &mut Config) {
        if let Some(prefix) = self.prefix {
            config.cephfs.prefix = Some(prefix);
        }
        if let Some(base) = self.log {
            config.log.base = Some(base);
        }
        if let Some(library) = self.library {
            config.preload.library = Some(library);
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a command with the preload library injected
    Run {
        #[command(flatten)]
        preload: PreloadArgs,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<OsString>,
    },

    /// Output shell exports for `eval "$(lazyio env)"`
    Env {
        #[command(flatten)]
        preload: PreloadArgs,
    },

    /// Report whether paths would be opened in Lazy I/O mode
    Check {
        /// Prefix to test against (defaults to the effective config)
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<PathBuf>,

        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print config file locations
    Path,
    /// Print a commented template
    Template,
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    init_logging(LogLevel::Warn);

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load lazyio configuration")?;

    match cli.command {
        Commands::Run { preload, command } => {
            preload.apply(&mut config);
            preload::cmd_run(&config, &command)
        }
        Commands::Env { preload } => {
            preload.apply(&mut config);
            preload::cmd_env(&config)
        }
        Commands::Check { prefix, paths } => {
            check::cmd_check(prefix.or(config.cephfs.prefix), &paths)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
            ConfigCommands::Path => {
                match Config::global_config_path() {
                    Some(p) => println!("Global:  {}", p.display()),
                    None => println!("Global:  (no home directory)"),
                }
                println!("Project: {}", PROJECT_CONFIG);
                Ok(())
            }
            ConfigCommands::Template => {
                print!("{}", Config::default_toml());
                Ok(())
            }
        },
    }
}
