// Job metrics
//
// Lock-free counters for the controller and reporter bridge, summarized in the log

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters collected over the controller's lifetime
#[derive(Debug)]
pub struct Metrics {
    pub jobs_started: AtomicUsize,
    pub jobs_succeeded: AtomicUsize,
    pub jobs_cancelled: AtomicUsize,
    pub jobs_failed: AtomicUsize,

    /// Designs appended to a result list
    pub designs_received: AtomicU64,

    /// Messages from a superseded worker that were discarded
    pub stale_items_dropped: AtomicU64,

    /// Pending submissions replaced by a newer one before they started
    pub submissions_superseded: AtomicU64,

    /// Reporter events dropped because the bridge queue was full
    pub reports_dropped: AtomicU64,

    pub total_job_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            jobs_started: AtomicUsize::new(0),
            jobs_succeeded: AtomicUsize::new(0),
            jobs_cancelled: AtomicUsize::new(0),
            jobs_failed: AtomicUsize::new(0),
            designs_received: AtomicU64::new(0),
            stale_items_dropped: AtomicU64::new(0),
            submissions_superseded: AtomicU64::new(0),
            reports_dropped: AtomicU64::new(0),
            total_job_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_job_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_succeeded(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_cancelled(&self) {
        self.jobs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_design(&self) {
        self.designs_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_item(&self) {
        self.stale_items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_superseded(&self) {
        self.submissions_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_dropped(&self) {
        self.reports_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_time(&self, duration: Duration) {
        self.total_job_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Mean wall time of finished jobs
    pub fn avg_job_time_ms(&self) -> f64 {
        let total = self.total_job_time_ms.load(Ordering::Relaxed);
        let count = self.jobs_succeeded.load(Ordering::Relaxed)
            + self.jobs_cancelled.load(Ordering::Relaxed)
            + self.jobs_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Job Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Jobs: {} started, {} succeeded, {} cancelled, {} failed",
            self.jobs_started.load(Ordering::Relaxed),
            self.jobs_succeeded.load(Ordering::Relaxed),
            self.jobs_cancelled.load(Ordering::Relaxed),
            self.jobs_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Designs received: {} (avg job time {:.2}ms)",
            self.designs_received.load(Ordering::Relaxed),
            self.avg_job_time_ms()
        );
        tracing::info!(
            "Stale items dropped: {}, superseded submissions: {}, dropped reports: {}",
            self.stale_items_dropped.load(Ordering::Relaxed),
            self.submissions_superseded.load(Ordering::Relaxed),
            self.reports_dropped.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.jobs_started.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.designs_received.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_job_outcomes() {
        let metrics = Metrics::new();

        metrics.record_job_started();
        metrics.record_job_started();
        metrics.record_job_started();
        metrics.record_job_succeeded();
        metrics.record_job_cancelled();
        metrics.record_job_failed();

        assert_eq!(metrics.jobs_started.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.jobs_succeeded.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.jobs_cancelled.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.jobs_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_avg_job_time() {
        let metrics = Metrics::new();
        assert_eq!(metrics.avg_job_time_ms(), 0.0);

        metrics.record_job_succeeded();
        metrics.record_job_time(Duration::from_millis(100));
        metrics.record_job_failed();
        metrics.record_job_time(Duration::from_millis(300));

        assert_eq!(metrics.avg_job_time_ms(), 200.0);
    }
}
