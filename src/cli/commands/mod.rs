//! CLI parser and dispatch.

mod config_cmd;
mod diff;
mod fix;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "parity")]
#[command(about = "Audit URL parity between production and a replacement deployment")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./parity.toml if present)
    #[arg(short, long, global = true, env = "PARITY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for reports (overrides config file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Diff the production inventory against the local one
    Diff {
        /// Production inventory JSON (overrides config file)
        #[arg(long)]
        production: Option<PathBuf>,
        /// Local inventory JSON (overrides config file)
        #[arg(long)]
        local: Option<PathBuf>,
    },

    /// Decide remediation for every missing URL and recover content
    Fix {
        /// Standalone rules file (overrides the [rules] section)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Local inventory used to validate redirect targets
        #[arg(long)]
        local: Option<PathBuf>,
        /// Decide actions without fetching any page
        #[arg(long)]
        no_extract: bool,
        /// Number of extraction workers (overrides config file)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Rebuild the redirect map instead of appending to it
        #[arg(long)]
        regenerate_redirects: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(&LoadOptions {
        config_path: cli.config,
        cwd: None,
    })?;
    if let Some(dir) = cli.output_dir {
        settings.paths.output_dir = dir;
    }

    match cli.command {
        Commands::Diff { production, local } => {
            diff::cmd_diff(&settings, production.as_deref(), local.as_deref())
        }
        Commands::Fix {
            rules,
            local,
            no_extract,
            workers,
            regenerate_redirects,
        } => {
            let options = crate::pipeline::FixOptions {
                rules_path: rules,
                local_inventory: local,
                skip_extraction: no_extract,
                workers,
                regenerate_redirects,
            };
            fix::cmd_fix(&settings, options).await
        }
        Commands::Config => config_cmd::cmd_config_show(&settings),
    }
}
