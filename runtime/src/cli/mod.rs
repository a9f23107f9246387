//! CLI subcommand implementations for the sitewatch binary.

pub mod doctor;
pub mod once_cmd;
pub mod run_cmd;

use crate::config::{FetchStrategy, InitialState, Settings};
use crate::fetch::build_fetcher;
use crate::notify::telegram::TelegramSink;
use crate::notify::Notifier;
use crate::runner::Runner;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialise tracing. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(format: LogFormat, default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sitewatch={default_level}")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}

/// Overrides applied on top of the settings file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub fetcher: Option<FetchStrategy>,
    pub initial_state: Option<InitialState>,
}

/// Load settings and apply command-line overrides.
pub fn load_settings(path: &Path, overrides: Overrides) -> Result<Settings> {
    let mut settings = Settings::load(path)
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    if let Some(fetcher) = overrides.fetcher {
        settings.fetcher = fetcher;
    }
    if let Some(initial_state) = overrides.initial_state {
        settings.initial_state = initial_state;
    }
    Ok(settings)
}

/// Wire fetcher, Telegram notifier and runner together.
pub fn build_runner(settings: &Settings) -> Result<Runner> {
    let fetcher = build_fetcher(settings.fetcher).context("failed to build fetcher")?;
    let sink = TelegramSink::new(settings.telegram.clone())
        .context("failed to build Telegram client")?;
    let sink = Arc::new(sink);
    Ok(Runner::new(settings, fetcher, Notifier::new(sink)))
}
