//! Long-running exploration loop with periodic snapshots and cooperative
//! cancellation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use super::{Explorer, IterationReport};
use crate::error::ExploreError;
use crate::oracle::Oracle;
use crate::snapshot;

/// When to write intermediate snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavePolicy {
    /// Save after this many analyses since the last save.
    pub every_analyses: Option<u64>,
    /// Save once this much time has passed since the last save.
    pub every: Option<Duration>,
}

impl Default for SavePolicy {
    fn default() -> Self {
        Self {
            every_analyses: Some(256),
            every: Some(Duration::from_secs(600)),
        }
    }
}

impl SavePolicy {
    fn is_due(&self, analyses_since_save: u64, elapsed: Duration) -> bool {
        self.every_analyses
            .is_some_and(|n| analyses_since_save >= n.max(1))
            || self.every.is_some_and(|interval| elapsed >= interval)
    }
}

/// Settings of [`Explorer::run`].
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub snapshot_path: PathBuf,
    pub save_policy: SavePolicy,
    /// Stop after this many analyses in this run.
    pub max_iterations: Option<u64>,
    /// Consecutive exhausted expansions tolerated before giving up.
    pub max_retries: u32,
    /// Pause before retrying an exhausted expansion, multiplied by the attempt number.
    pub retry_delay: Duration,
}

impl RunOptions {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            save_policy: SavePolicy::default(),
            max_iterations: None,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Why a run ended.
#[derive(Debug)]
pub enum StopReason {
    /// The cancellation flag was raised.
    Cancelled,
    /// The configured number of analyses was reached.
    IterationLimit,
    /// An iteration, or the final snapshot, failed.
    Failed(ExploreError),
}

/// Final state reported after the shutdown sequence.
#[derive(Debug)]
pub struct RunSummary {
    /// Analyses performed during this run.
    pub analyses: u64,
    /// Analyses recorded in the tree, including earlier runs.
    pub total_analyses: u64,
    pub nodes: usize,
    pub snapshot_path: PathBuf,
    pub stop: StopReason,
}

/// Receives progress notifications from [`Explorer::run`].
pub trait RunObserver {
    /// Called before the oracle is queried for analysis number `analysis`.
    fn analysis_started(&mut self, _analysis: u64) {}

    fn analysis_finished(&mut self, report: &IterationReport);

    /// Called when an iteration failed and will be attempted again.
    fn retrying(&mut self, _error: &ExploreError, _attempt: u32) {}

    fn saved(&mut self, _path: &Path, _nodes: usize) {}
}

impl RunObserver for () {
    fn analysis_finished(&mut self, _report: &IterationReport) {}
}

impl<O: Oracle> Explorer<'_, O> {
    /// Grows the tree until cancelled, limited, or failed.
    ///
    /// `cancel` is checked before every iteration. Whatever ends the loop,
    /// a final snapshot is written and the oracle is shut down before
    /// returning.
    pub fn run(
        &mut self,
        options: &RunOptions,
        cancel: &AtomicBool,
        observer: &mut dyn RunObserver,
    ) -> RunSummary {
        let start_count = self.store.analysis_count();
        let stop = self.run_loop(options, cancel, observer);

        let stop = match self.save(&options.snapshot_path, observer) {
            Ok(()) => stop,
            Err(err) => match stop {
                StopReason::Failed(first) => {
                    error!("Final snapshot failed: {err}");
                    StopReason::Failed(first)
                }
                _ => StopReason::Failed(err),
            },
        };

        if let Err(err) = self.shutdown() {
            warn!("Engine shutdown failed: {err}");
        }

        let total_analyses = self.store.analysis_count();
        RunSummary {
            analyses: total_analyses - start_count,
            total_analyses,
            nodes: self.store.len(),
            snapshot_path: options.snapshot_path.clone(),
            stop,
        }
    }

    fn run_loop(
        &mut self,
        options: &RunOptions,
        cancel: &AtomicBool,
        observer: &mut dyn RunObserver,
    ) -> StopReason {
        let mut performed = 0u64;
        let mut since_save = 0u64;
        let mut last_save = Instant::now();
        let mut failures = 0u32;

        loop {
            if cancel.load(Ordering::SeqCst) {
                info!("Exploration cancelled");
                return StopReason::Cancelled;
            }
            if options.max_iterations.is_some_and(|max| performed >= max) {
                return StopReason::IterationLimit;
            }

            observer.analysis_started(self.store.analysis_count() + 1);
            match self.step() {
                Ok(report) => {
                    failures = 0;
                    performed += 1;
                    since_save += 1;
                    observer.analysis_finished(&report);
                }
                Err(_) if cancel.load(Ordering::SeqCst) => {
                    info!("Exploration cancelled during analysis");
                    return StopReason::Cancelled;
                }
                Err(err) if err.is_retryable() && failures < options.max_retries => {
                    failures += 1;
                    warn!("{err}; retry {failures}/{}", options.max_retries);
                    observer.retrying(&err, failures);
                    thread::sleep(options.retry_delay * failures);
                    continue;
                }
                Err(err) => return StopReason::Failed(err),
            }

            if options.save_policy.is_due(since_save, last_save.elapsed()) {
                if let Err(err) = self.save(&options.snapshot_path, observer) {
                    return StopReason::Failed(err);
                }
                since_save = 0;
                last_save = Instant::now();
            }
        }
    }

    fn save(&self, path: &Path, observer: &mut dyn RunObserver) -> Result<(), ExploreError> {
        snapshot::save_to_path(&self.store, path)?;
        info!(
            "Saved {} nodes ({} analyses) to {}",
            self.store.len(),
            self.store.analysis_count(),
            path.display()
        );
        observer.saved(path, self.store.len());
        Ok(())
    }
}
