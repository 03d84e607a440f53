//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the telemetry generator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Running aggregates of wall-clock durations such as tick pass times.
///
/// Only count, mean, squared-deviation sum and extremes are kept, so memory
/// stays constant however long the scheduler runs.
#[derive(Debug, Default)]
pub struct DurationHistogram {
    stats: Mutex<RunningStats>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    // Welford's update keeps the variance numerically stable.
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }
}

impl DurationHistogram {
    pub fn record(&self, elapsed: Duration) {
        self.stats.lock().push(elapsed.as_secs_f64() * 1_000.0);
    }

    /// Number of durations recorded so far.
    pub fn len(&self) -> u64 {
        self.stats.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> Option<DurationSummary> {
        let stats = *self.stats.lock();
        if stats.count == 0 {
            return None;
        }
        let variance = if stats.count > 1 {
            stats.m2 / (stats.count - 1) as f64
        } else {
            0.0
        };
        Some(DurationSummary {
            mean_ms: stats.mean,
            std_dev_ms: variance.max(0.0).sqrt(),
            max_ms: stats.max,
            min_ms: stats.min,
            samples: stats.count,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DurationSummary {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub max_ms: f64,
    pub min_ms: f64,
    pub samples: u64,
}

/// Running totals of publish outcomes across the lifetime of a scheduler.
#[derive(Debug, Default)]
pub struct PublishCounters {
    published: AtomicU64,
    failed: AtomicU64,
}

impl PublishCounters {
    pub fn record_published(&self, count: u64) {
        self.published.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
