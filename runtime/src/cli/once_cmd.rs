//! Run a single cycle and print what happened to each target.

use super::{build_runner, load_settings, Overrides};
use crate::runner::{CheckOutcome, CycleReport};
use anyhow::Result;
use std::path::Path;

/// One pass over all targets. Alerts are delivered exactly as in `run`.
pub async fn run(config: &Path, overrides: Overrides, json: bool) -> Result<()> {
    let settings = load_settings(config, overrides)?;
    let mut runner = build_runner(&settings)?;

    runner.start().await;
    let report = runner.run_cycle().await;
    runner.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

/// Human-readable cycle summary, one line per target.
pub fn format_report(report: &CycleReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let line = match &check.outcome {
            CheckOutcome::Unchanged { present } => {
                format!("[OK] {}: marker {} (unchanged)", check.target, word(*present))
            }
            CheckOutcome::Baseline { present } => {
                format!("[OK] {}: marker {} (baseline)", check.target, word(*present))
            }
            CheckOutcome::Notified { kind, delivered } => format!(
                "[!!] {}: {:?} alert{}",
                check.target,
                kind,
                if *delivered { "" } else { " (delivery failed)" }
            ),
            CheckOutcome::Failed { detail, delivered } => format!(
                "[!!] {}: error: {detail}{}",
                check.target,
                if *delivered { "" } else { " (delivery failed)" }
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!(
        "{} checked, {} failed in {}ms\n",
        report.checks.len(),
        report.failures(),
        report.elapsed_ms
    ));
    out
}

fn word(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "absent"
    }
}
