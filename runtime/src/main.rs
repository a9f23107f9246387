// Copyright 2026 Sitewatch Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use sitewatch::cli::{self, LogFormat, Overrides};
use sitewatch::config::{FetchStrategy, InitialState, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(
    name = "sitewatch",
    about = "sitewatch — alert on Telegram when a marker appears or disappears on a web page",
    version,
    after_help = "Run 'sitewatch <command> --help' for details on each command.\nRun 'sitewatch' with no command to start watching."
)]
struct Cli {
    /// Path to the JSON settings file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct OverrideArgs {
    /// Fetch strategy, overriding the settings file
    #[arg(long, value_enum)]
    fetcher: Option<FetchStrategy>,
    /// Initial presence policy, overriding the settings file
    #[arg(long, value_enum)]
    initial_state: Option<InitialState>,
}

impl From<OverrideArgs> for Overrides {
    fn from(a: OverrideArgs) -> Self {
        Overrides {
            fetcher: a.fetcher,
            initial_state: a.initial_state,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Watch all targets until interrupted (default)
    Run {
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Check every target once, print a report and exit
    Once {
        #[command(flatten)]
        overrides: OverrideArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate settings and check for Chromium
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    cli::init_tracing(cli.log_format, level);

    let result = match cli.command {
        None => cli::run_cmd::run(&cli.config, Overrides::default()).await,
        Some(Commands::Run { overrides }) => cli::run_cmd::run(&cli.config, overrides.into()).await,
        Some(Commands::Once { overrides, json }) => {
            cli::once_cmd::run(&cli.config, overrides.into(), json).await
        }
        Some(Commands::Doctor) => cli::doctor::run(&cli.config).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sitewatch", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!("{e:#}");
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
