use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Transaction engine counters
#[derive(Debug, Default)]
pub struct TransactionMetrics {
    pub started: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub late_completions: AtomicU64,
}

impl TransactionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// A completion or timeout that lost the race against the other path
    pub fn record_late_completion(&self) {
        self.late_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TransactionStats {
        TransactionStats {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            late_completions: self.late_completions.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Transaction metrics: started={}, succeeded={}, failed={}, timed_out={}, late_completions={}",
            stats.started,
            stats.succeeded,
            stats.failed,
            stats.timed_out,
            stats.late_completions
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub late_completions: u64,
}

/// Global metrics instance
static TRANSACTION_METRICS: std::sync::LazyLock<TransactionMetrics> =
    std::sync::LazyLock::new(TransactionMetrics::new);

pub fn transaction_metrics() -> &'static TransactionMetrics {
    &TRANSACTION_METRICS
}

/// Time a transaction from start to its single outcome
#[derive(Debug)]
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self, outcome: &str) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            outcome = outcome,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
