//! Environment readiness check.

use crate::config::{FetchStrategy, Settings};
use crate::renderer::chromium::{find_chromium, CHROMIUM_PATH_ENV};
use anyhow::Result;
use std::path::Path;

/// Validate the settings file and check Chromium availability.
pub async fn run(config: &Path) -> Result<()> {
    println!("sitewatch doctor");
    println!("================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let settings = match Settings::load(config) {
        Ok(s) => {
            println!(
                "[OK] Settings {}: {} targets, every {}s, timeout {}s, fetcher {:?}, initial state {:?}",
                config.display(),
                s.targets.len(),
                s.interval.as_secs_f64(),
                s.timeout.as_secs_f64(),
                s.fetcher,
                s.initial_state,
            );
            Some(s)
        }
        Err(e) => {
            println!("[!!] Settings {}: {e}", config.display());
            None
        }
    };

    let chromium_path = find_chromium();
    let needs_browser = settings
        .as_ref()
        .is_some_and(|s| s.fetcher == FetchStrategy::Browser);
    match (&chromium_path, needs_browser) {
        (Some(path), _) => println!("[OK] Chromium found: {}", path.display()),
        (None, true) => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set {CHROMIUM_PATH_ENV}."
        ),
        (None, false) => println!("[??] Chromium not found (only needed for the browser fetcher)"),
    }

    println!();
    let ready = settings.is_some() && (!needs_browser || chromium_path.is_some());
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
