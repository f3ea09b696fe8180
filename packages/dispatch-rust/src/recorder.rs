//! Per-operation timing accumulators.

use venue_core::OperationKey;

// ---------------------------------------------------------------------------
// ExecutionTimingRecorder
// ---------------------------------------------------------------------------

/// Timing/failure sink for one registered operation.
///
/// The dispatcher guarantees exactly one `record_call` or `record_failure`
/// per dispatched call, including the timeout, validation, and not-found
/// paths. Implementations are shared, concurrently-mutated accumulators
/// and must be safe for lock-free use from many tasks.
pub trait ExecutionTimingRecorder: Send + Sync {
    /// A call completed without a fault.
    fn record_call(&self, elapsed_ms: f64);

    /// A call completed with a fault (including synthesized ones).
    fn record_failure(&self, elapsed_ms: f64);
}

// ---------------------------------------------------------------------------
// NullRecorder
// ---------------------------------------------------------------------------

/// Recorder that drops everything. Used for event operations and wiring
/// tests where timing is irrelevant.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl ExecutionTimingRecorder for NullRecorder {
    fn record_call(&self, _elapsed_ms: f64) {}
    fn record_failure(&self, _elapsed_ms: f64) {}
}

// ---------------------------------------------------------------------------
// MetricsRecorder
// ---------------------------------------------------------------------------

/// Recorder emitting through the `metrics` facade with a per-operation
/// label, for export by whatever recorder the process installs
/// (Prometheus, statsd, ...).
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    operation: String,
}

impl MetricsRecorder {
    #[must_use]
    pub fn new(key: &OperationKey) -> Self {
        Self {
            operation: key.method_name(),
        }
    }
}

impl ExecutionTimingRecorder for MetricsRecorder {
    fn record_call(&self, elapsed_ms: f64) {
        metrics::counter!("venue_calls_total", "operation" => self.operation.clone())
            .increment(1);
        metrics::histogram!("venue_call_duration_ms", "operation" => self.operation.clone())
            .record(elapsed_ms);
    }

    fn record_failure(&self, elapsed_ms: f64) {
        metrics::counter!("venue_failures_total", "operation" => self.operation.clone())
            .increment(1);
        metrics::histogram!("venue_call_duration_ms", "operation" => self.operation.clone())
            .record(elapsed_ms);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use venue_core::{OperationType, ServiceVersion};

    use super::*;

    struct CountingRecorder {
        calls: AtomicU32,
        failures: AtomicU32,
    }

    impl ExecutionTimingRecorder for CountingRecorder {
        fn record_call(&self, _elapsed_ms: f64) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        fn record_failure(&self, _elapsed_ms: f64) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn recorder_is_shareable_across_tasks() {
        let recorder = Arc::new(CountingRecorder {
            calls: AtomicU32::new(0),
            failures: AtomicU32::new(0),
        });
        let shared: Arc<dyn ExecutionTimingRecorder> = recorder.clone();
        shared.record_call(1.5);
        shared.record_failure(2.5);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_recorder_labels_by_method_name() {
        let key = OperationKey::new(
            "Baseline",
            ServiceVersion::new(2, 0),
            "testSimpleGet",
            OperationType::Request,
        );
        let recorder = MetricsRecorder::new(&key);
        assert_eq!(recorder.operation, "baseline/v2.0/testSimpleGet");
        // Emitting without an installed metrics recorder is a no-op.
        recorder.record_call(0.1);
        recorder.record_failure(0.1);
    }
}
