//! Cleanup Metrics
//!
//! Thread-safe counters for monitoring cleanup runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe metrics for tracking cleanup runs
#[derive(Debug, Clone)]
pub struct CleanupMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Number of cleanup runs started
    runs_started: AtomicUsize,
    /// Runs that ended early without deleting (disabled, no backups, nothing to delete)
    runs_skipped: AtomicUsize,
    /// Runs aborted by a listing failure
    runs_aborted: AtomicUsize,
    /// Objects returned by listings
    objects_listed: AtomicUsize,
    /// Objects recognized as backups
    backups_parsed: AtomicUsize,
    /// Successful deletions
    deletions_succeeded: AtomicUsize,
    /// Failed deletions
    deletions_failed: AtomicUsize,
}

impl Default for CleanupMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanupMetrics {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                runs_started: AtomicUsize::new(0),
                runs_skipped: AtomicUsize::new(0),
                runs_aborted: AtomicUsize::new(0),
                objects_listed: AtomicUsize::new(0),
                backups_parsed: AtomicUsize::new(0),
                deletions_succeeded: AtomicUsize::new(0),
                deletions_failed: AtomicUsize::new(0),
            }),
        }
    }

    pub fn record_run_started(&self) {
        self.inner.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_skipped(&self) {
        self.inner.runs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_aborted(&self) {
        self.inner.runs_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_objects_listed(&self, count: usize) {
        self.inner.objects_listed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_backups_parsed(&self, count: usize) {
        self.inner.backups_parsed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_deletion_succeeded(&self) {
        self.inner
            .deletions_succeeded
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletion_failed(&self) {
        self.inner.deletions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn runs_started(&self) -> usize {
        self.inner.runs_started.load(Ordering::Relaxed)
    }

    pub fn runs_skipped(&self) -> usize {
        self.inner.runs_skipped.load(Ordering::Relaxed)
    }

    pub fn runs_aborted(&self) -> usize {
        self.inner.runs_aborted.load(Ordering::Relaxed)
    }

    pub fn objects_listed(&self) -> usize {
        self.inner.objects_listed.load(Ordering::Relaxed)
    }

    pub fn backups_parsed(&self) -> usize {
        self.inner.backups_parsed.load(Ordering::Relaxed)
    }

    pub fn deletions_succeeded(&self) -> usize {
        self.inner.deletions_succeeded.load(Ordering::Relaxed)
    }

    pub fn deletions_failed(&self) -> usize {
        self.inner.deletions_failed.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            runs_started: self.runs_started(),
            runs_skipped: self.runs_skipped(),
            runs_aborted: self.runs_aborted(),
            objects_listed: self.objects_listed(),
            backups_parsed: self.backups_parsed(),
            deletions_succeeded: self.deletions_succeeded(),
            deletions_failed: self.deletions_failed(),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub runs_started: usize,
    pub runs_skipped: usize,
    pub runs_aborted: usize,
    pub objects_listed: usize,
    pub backups_parsed: usize,
    pub deletions_succeeded: usize,
    pub deletions_failed: usize,
}

impl MetricsSummary {
    /// Log the metrics summary
    pub fn log(&self) {
        tracing::info!(
            runs_started = self.runs_started,
            runs_skipped = self.runs_skipped,
            runs_aborted = self.runs_aborted,
            objects_listed = self.objects_listed,
            backups_parsed = self.backups_parsed,
            deletions_succeeded = self.deletions_succeeded,
            deletions_failed = self.deletions_failed,
            "Cleanup metrics summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = CleanupMetrics::new();
        assert_eq!(metrics.runs_started(), 0);
        assert_eq!(metrics.deletions_succeeded(), 0);
        assert_eq!(metrics.deletions_failed(), 0);
    }

    #[test]
    fn test_metrics_increment() {
        let metrics = CleanupMetrics::new();

        metrics.record_run_started();
        metrics.record_run_started();
        metrics.record_run_skipped();
        metrics.record_run_aborted();
        metrics.record_objects_listed(12);
        metrics.record_backups_parsed(10);
        metrics.record_deletion_succeeded();
        metrics.record_deletion_succeeded();
        metrics.record_deletion_failed();

        assert_eq!(
            metrics.summary(),
            MetricsSummary {
                runs_started: 2,
                runs_skipped: 1,
                runs_aborted: 1,
                objects_listed: 12,
                backups_parsed: 10,
                deletions_succeeded: 2,
                deletions_failed: 1,
            }
        );
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = CleanupMetrics::new();
        let clone = metrics.clone();

        clone.record_deletion_succeeded();
        assert_eq!(metrics.deletions_succeeded(), 1);
    }
}
