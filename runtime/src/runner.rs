//! Poll loop.
//!
//! One cycle checks every target in configured order: fetch, evaluate,
//! detect, notify. Each check runs inside its own failure boundary; a fetch
//! error or a panic becomes an Error notification for that target and the
//! cycle moves on. Between cycles the runner sleeps for the configured
//! interval, so the real period is processing time plus interval.

use crate::config::{InitialState, Settings};
use crate::evaluate::is_present;
use crate::fetch::Fetcher;
use crate::notify::{NotificationKind, Notifier};
use crate::target::{Presence, Target};
use crate::watch::ChangeDetector;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// What happened to one target in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Observation matched the stored state.
    Unchanged { present: bool },
    /// A transition fired a Changed or Restored alert.
    Notified {
        kind: NotificationKind,
        delivered: bool,
    },
    /// The baseline was established without an alert.
    Baseline { present: bool },
    /// The check failed; an Error alert was sent.
    Failed { detail: String, delivered: bool },
}

/// Per-target result of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub target: String,
    pub outcome: CheckOutcome,
    /// Stored presence after the check.
    pub presence: Presence,
}

/// Result of one pass over all targets.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub checks: Vec<CheckReport>,
    pub elapsed_ms: u64,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| matches!(c.outcome, CheckOutcome::Failed { .. }))
            .count()
    }

    pub fn notifications(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| {
                matches!(
                    c.outcome,
                    CheckOutcome::Notified { .. } | CheckOutcome::Failed { .. }
                )
            })
            .count()
    }
}

/// Drives repeated evaluation of every target.
pub struct Runner {
    targets: Vec<Target>,
    fetcher: Arc<dyn Fetcher>,
    detector: ChangeDetector,
    notifier: Notifier,
    interval: Duration,
    timeout: Duration,
}

impl Runner {
    pub fn new(settings: &Settings, fetcher: Arc<dyn Fetcher>, notifier: Notifier) -> Self {
        Self::with_targets(
            settings.targets.clone(),
            fetcher,
            notifier,
            settings.initial_state,
            settings.interval,
            settings.timeout,
        )
    }

    pub fn with_targets(
        targets: Vec<Target>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Notifier,
        initial_state: InitialState,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let detector = ChangeDetector::new(&targets, initial_state);
        Self {
            targets,
            fetcher,
            detector,
            notifier,
            interval,
            timeout,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Startup hook: let the fetcher prepare long-lived resources.
    ///
    /// A failure is not fatal; the fetcher retries on its next check.
    pub async fn start(&self) {
        info!(
            targets = self.targets.len(),
            fetcher = ?self.fetcher.strategy(),
            interval_s = self.interval.as_secs_f64(),
            timeout_s = self.timeout.as_secs_f64(),
            "monitoring {} targets",
            self.targets.len()
        );
        if let Err(e) = self.fetcher.acquire().await {
            warn!("fetcher not ready yet, will retry on first check: {e}");
        }
    }

    /// Shutdown hook: release the fetcher's resources.
    pub async fn shutdown(&self) {
        self.fetcher.release().await;
        info!("runner stopped");
    }

    /// Check every target once, in order.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();
        let mut checks = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let report = AssertUnwindSafe(Self::check(
                self.fetcher.as_ref(),
                &mut self.detector,
                &self.notifier,
                target,
                self.timeout,
            ))
            .catch_unwind()
            .await;

            let report = match report {
                Ok(report) => report,
                Err(panic) => {
                    let detail = format!("internal error: {}", panic_message(panic.as_ref()));
                    error!(target_name = %target.name, "check aborted: {detail}");
                    let delivered = self
                        .notifier
                        .notify(NotificationKind::Error, target, Some(&detail))
                        .await;
                    CheckReport {
                        target: target.name.clone(),
                        outcome: CheckOutcome::Failed { detail, delivered },
                        presence: self.detector.presence(&target.name),
                    }
                }
            };
            checks.push(report);
        }

        CycleReport {
            checks,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Cycle forever.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending()).await;
    }

    /// Cycle until `shutdown` resolves, then release the fetcher.
    ///
    /// Shutdown is observed at the fetch and sleep suspension points.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.start().await;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                report = self.run_cycle() => {
                    info!(
                        checked = report.checks.len(),
                        notifications = report.notifications(),
                        failures = report.failures(),
                        elapsed_ms = report.elapsed_ms,
                        "cycle complete"
                    );
                }
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("shutting down");
        self.shutdown().await;
    }

    async fn check(
        fetcher: &dyn Fetcher,
        detector: &mut ChangeDetector,
        notifier: &Notifier,
        target: &Target,
        timeout: Duration,
    ) -> CheckReport {
        info!(target_name = %target.name, "checking {}", target.url);

        let page = match fetcher.fetch(&target.url, timeout).await {
            Ok(page) => page,
            Err(e) => {
                let detail = e.to_string();
                error!(target_name = %target.name, "error checking target: {detail}");
                let delivered = notifier
                    .notify(NotificationKind::Error, target, Some(&detail))
                    .await;
                return CheckReport {
                    target: target.name.clone(),
                    outcome: CheckOutcome::Failed { detail, delivered },
                    presence: detector.presence(&target.name),
                };
            }
        };

        let present = is_present(&page.body, &target.marker);
        info!(
            target_name = %target.name,
            marker = %target.marker,
            present,
            "checked for marker"
        );

        let decision = detector.observe(target, present);
        let outcome = match decision.alert {
            Some(kind) => {
                match kind {
                    NotificationKind::Restored => {
                        info!(target_name = %target.name, "marker \"{}\" is present again", target.marker)
                    }
                    _ => {
                        info!(target_name = %target.name, "marker \"{}\" is no longer present", target.marker)
                    }
                }
                let delivered = notifier.notify(kind, target, None).await;
                CheckOutcome::Notified { kind, delivered }
            }
            None if decision.previous == Presence::Unknown => CheckOutcome::Baseline { present },
            None => CheckOutcome::Unchanged { present },
        };

        CheckReport {
            target: target.name.clone(),
            outcome,
            presence: decision.next,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
