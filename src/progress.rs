//! # Progress Reporting
//!
//! Rolling per-run statistics and the stdout progress protocol consumed by
//! the supervising process.
//!
//! After every task the driver emits exactly one sentinel-prefixed,
//! pipe-delimited record:
//!
//! ```text
//! BATCH_PROGRESS::current_index=2|total_images=14|current_file=b.jpg|avg_time=3.1|elapsed=6.3|eta=37.4
//! ```
//!
//! A supervisor splits on the sentinel, then on `|`, then on `=`. No
//! free-form text may share a line with the sentinel, and no other stdout
//! line may begin with it.

use std::{io, io::Write, time::Duration};

/// Prefix marking a machine-parseable progress record on stdout.
pub const PROGRESS_SENTINEL: &str = "BATCH_PROGRESS::";

/// Running per-item duration statistics for one invocation.
///
/// State is local to a single run; the driver constructs a fresh instance
/// per batch and discards it afterwards.
#[derive(Debug, Default)]
pub struct RunStats {
    durations_secs: Vec<f64>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the wall-clock duration of a completed task.
    pub fn record(&mut self, duration: Duration) {
        self.durations_secs.push(duration.as_secs_f64());
    }

    /// Mean seconds per task over every task completed so far.
    pub fn average_secs(&self) -> f64 {
        if self.durations_secs.is_empty() {
            return 0.0;
        }
        self.durations_secs.iter().sum::<f64>() / self.durations_secs.len() as f64
    }

    /// Estimated seconds remaining: remaining task count times the average.
    pub fn eta_secs(&self, remaining: usize) -> f64 {
        remaining as f64 * self.average_secs()
    }
}

/// One progress record, recomputed after every task and never persisted.
#[derive(Debug)]
pub struct ProgressEvent<'a> {
    /// 1-based index of the task that just completed.
    pub current_index: usize,
    /// Total number of tasks in the run.
    pub total_images: usize,
    /// Input filename of the task that just completed.
    pub current_file: &'a str,
    /// Rolling average seconds per task.
    pub avg_time: f64,
    /// Wall-clock seconds since the run started.
    pub elapsed: f64,
    /// Estimated seconds remaining.
    pub eta: f64,
}

impl ProgressEvent<'_> {
    /// Write this event as a single sentinel-prefixed protocol line.
    pub fn emit(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{PROGRESS_SENTINEL}current_index={}|total_images={}|current_file={}|avg_time={:.1}|elapsed={:.1}|eta={:.1}",
            self.current_index, self.total_images, self.current_file, self.avg_time, self.elapsed, self.eta,
        )
    }
}
