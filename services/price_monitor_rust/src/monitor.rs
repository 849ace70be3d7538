//! PriceMonitor: the fetch → evaluate → notify → persist cycle.
//!
//! One monitor owns the price snapshot for the lifetime of the process and
//! runs on a single task. Every cycle returns a [`CycleOutcome`]; nothing a
//! cycle does can end the loop.

use chrono::Utc;
use polywatch_core::clients::{AlertSink, FetchError, MarketSource};
use polywatch_core::evaluator::{DeltaEvaluator, Evaluation, RecordReason};
use polywatch_core::models::{Market, PriceKey};
use polywatch_core::snapshot::{PriceSnapshot, PriceSnapshotStore, SnapshotError};
use polywatch_core::PriceAlert;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("market fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("snapshot save failed: {0}")]
    Persist(#[from] SnapshotError),
}

/// Per-cycle counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub markets: usize,
    pub outcomes_seen: usize,
    /// Outcomes without a parsable price
    pub outcomes_skipped: usize,
    /// Outcomes whose key was already evaluated earlier in the same cycle
    pub outcomes_duplicate: usize,
    pub first_observations: usize,
    pub alerts_detected: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub snapshot_size: usize,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Something transient went wrong; the loop carries on next cycle.
    Recoverable {
        report: CycleReport,
        error: CycleError,
    },
}

impl CycleOutcome {
    pub fn report(&self) -> &CycleReport {
        match self {
            CycleOutcome::Completed(report) => report,
            CycleOutcome::Recoverable { report, .. } => report,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

pub struct PriceMonitor<S, N> {
    source: S,
    sink: N,
    store: PriceSnapshotStore,
    snapshot: PriceSnapshot,
    evaluator: DeltaEvaluator,
    interval: Duration,
    /// In-memory snapshot is ahead of the file
    unsaved: bool,
}

impl<S, N> PriceMonitor<S, N>
where
    S: MarketSource + 'static,
    N: AlertSink + 'static,
{
    /// Build the monitor and load the persisted snapshot.
    pub fn initialize(
        source: S,
        sink: N,
        store: PriceSnapshotStore,
        evaluator: DeltaEvaluator,
        interval: Duration,
    ) -> Self {
        let snapshot = store.load();
        info!(
            "Loaded {} stored prices from {}",
            snapshot.len(),
            store.path().display()
        );

        Self {
            source,
            sink,
            store,
            snapshot,
            evaluator,
            interval,
            unsaved: false,
        }
    }

    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshot
    }

    /// Spawn the loop on its own task.
    pub fn start(self) -> MonitorHandle {
        MonitorHandle {
            task: tokio::spawn(self.run()),
        }
    }

    /// Run cycles forever, sleeping `interval` after each one.
    pub async fn run(mut self) {
        info!(
            "Starting price monitor: source={} interval={}s threshold={}",
            self.source.source_name(),
            self.interval.as_secs(),
            self.evaluator.threshold()
        );

        loop {
            match self.run_cycle().await {
                CycleOutcome::Completed(report) => {
                    info!(
                        markets = report.markets,
                        outcomes = report.outcomes_seen,
                        skipped = report.outcomes_skipped,
                        duplicates = report.outcomes_duplicate,
                        alerts = report.alerts_detected,
                        sent = report.alerts_sent,
                        failed = report.alerts_failed,
                        stored = report.snapshot_size,
                        "Cycle complete"
                    );
                }
                CycleOutcome::Recoverable { report, error } => {
                    warn!(
                        markets = report.markets,
                        alerts = report.alerts_detected,
                        "Cycle ended early: {}",
                        error
                    );
                }
            }

            info!("Sleeping for {}s", self.interval.as_secs());
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One fetch → evaluate → notify → persist pass.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let mut report = CycleReport {
            snapshot_size: self.snapshot.len(),
            ..CycleReport::default()
        };

        let markets = match self.source.fetch_markets().await {
            Ok(markets) => markets,
            Err(e) => {
                error!("Error fetching markets: {}", e);
                // Nothing new to write, only a save left over from an earlier cycle
                if self.unsaved && self.persist().is_ok() {
                    info!("Saved prices left over from an earlier cycle");
                }
                return CycleOutcome::Recoverable {
                    report,
                    error: e.into(),
                };
            }
        };

        if markets.is_empty() {
            info!("No markets received");
        } else {
            info!("Fetched {} markets", markets.len());
        }
        report.markets = markets.len();

        let mut seen = HashSet::new();
        for market in &markets {
            self.process_market(market, &mut seen, &mut report).await;
        }

        report.snapshot_size = self.snapshot.len();

        match self.persist() {
            Ok(()) => CycleOutcome::Completed(report),
            Err(e) => CycleOutcome::Recoverable {
                report,
                error: e.into(),
            },
        }
    }

    fn persist(&mut self) -> Result<(), SnapshotError> {
        match self.store.save(&self.snapshot) {
            Ok(()) => {
                self.unsaved = false;
                Ok(())
            }
            Err(e) => {
                error!("Failed to save last prices: {}", e);
                self.unsaved = true;
                Err(e)
            }
        }
    }

    async fn process_market(
        &mut self,
        market: &Market,
        seen: &mut HashSet<PriceKey>,
        report: &mut CycleReport,
    ) {
        for outcome in &market.outcomes {
            report.outcomes_seen += 1;

            let Some(price) = outcome.price() else {
                debug!(
                    "Skipping {} / {}: no usable price ({:?})",
                    market.id, outcome.name, outcome.raw_price
                );
                report.outcomes_skipped += 1;
                continue;
            };

            let key = PriceKey::new(&market.id, &outcome.name);
            if !seen.insert(key.clone()) {
                // Comparing against a price written this cycle would fake a move
                debug!("Skipping {}: key already evaluated this cycle", key);
                report.outcomes_duplicate += 1;
                continue;
            }

            match self.evaluator.evaluate(&key, price, &mut self.snapshot) {
                Evaluation::RecordOnly(RecordReason::FirstObservation) => {
                    report.first_observations += 1;
                }
                Evaluation::RecordOnly(_) => {}
                Evaluation::Alert(mv) => {
                    report.alerts_detected += 1;
                    info!(
                        "Significant change detected for {} / {}: {:+.2}%",
                        market.title,
                        outcome.name,
                        mv.change_pct()
                    );

                    let alert = PriceAlert::new(market, &outcome.name, &mv, Utc::now());
                    if self.sink.notify(&alert).await {
                        report.alerts_sent += 1;
                    } else {
                        report.alerts_failed += 1;
                    }
                }
            }
        }
    }
}

/// Handle to a running monitor task, held by the composition root.
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Resolves only if the task panics or is stopped.
    pub async fn wait(&mut self) -> Result<(), JoinError> {
        (&mut self.task).await
    }
}
