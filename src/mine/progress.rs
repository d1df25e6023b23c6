//! Progress reporting for a mining pass.
//!
//! Keeps the orchestrator free of UI concerns (indicatif).

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub trait ProgressReporter {
    fn update(&self, commits: u64, open_keys: usize, flushed: u64);
    fn finish(&self, commits: u64, flushed: u64);
}

/// Spinner on stderr showing commits processed and open keys.
pub struct SpinnerProgress {
    pb: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("Mining commits...");
        Self { pb }
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SpinnerProgress {
    fn update(&self, commits: u64, open_keys: usize, flushed: u64) {
        self.pb.set_message(format!(
            "{commits} commits, {open_keys} open methods, {flushed} rows written"
        ));
    }

    fn finish(&self, commits: u64, flushed: u64) {
        self.pb
            .finish_with_message(format!("Mined {commits} commits into {flushed} rows"));
    }
}

/// No-op reporter for quiet mode and tests.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&self, _commits: u64, _open_keys: usize, _flushed: u64) {}

    fn finish(&self, _commits: u64, _flushed: u64) {}
}
