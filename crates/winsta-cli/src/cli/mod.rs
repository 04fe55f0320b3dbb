//! CLI for winsta.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use winsta_core::config::{self, WinstaConfig};
use winsta_core::control;
use winsta_core::pipeline::PipelineError;
use winsta_core::release::Quality;

use commands::{run_checksum, run_download, run_install};

/// Top-level CLI for winsta.
#[derive(Debug, Parser)]
#[command(name = "winsta")]
#[command(about = "winsta: fetch, verify and silently install the latest VS Code build", long_about = None)]
pub struct Cli {
    /// Use this config file instead of the per-user default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the latest installer, verify it and run it silently.
    Install {
        /// Release channel (stable or insider); defaults to the configured one.
        #[arg(long, value_name = "QUALITY")]
        quality: Option<Quality>,
    },

    /// Download and verify the latest installer without running it.
    Download {
        /// Release channel (stable or insider); defaults to the configured one.
        #[arg(long, value_name = "QUALITY")]
        quality: Option<Quality>,

        /// Where to write the installer.
        #[arg(long, short, value_name = "PATH")]
        output: PathBuf,
    },

    /// Compute SHA-256 of a file, optionally checking it against a known digest.
    Checksum {
        /// Path to the file.
        path: PathBuf,

        /// Expected digest as 64 hex characters.
        #[arg(long, value_name = "HEX")]
        expect: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Install { quality } => {
                let cfg = load_config(cli.config.as_deref())?;
                let quality = quality.unwrap_or(cfg.quality);
                run_install(&cfg, quality).await?;
            }
            CliCommand::Download { quality, output } => {
                let cfg = load_config(cli.config.as_deref())?;
                let quality = quality.unwrap_or(cfg.quality);
                run_download(&cfg, quality, &output).await?;
            }
            CliCommand::Checksum { path, expect } => {
                run_checksum(&path, expect.as_deref()).await?;
            }
        }

        Ok(())
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<WinstaConfig> {
    let cfg = match path {
        Some(p) => config::load_or_init_at(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

/// True if `err` means the user interrupted the run.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PipelineError>()
        .map(PipelineError::is_cancelled)
        .unwrap_or_else(|| control::is_cancellation(err))
}
