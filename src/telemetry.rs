use std::sync::Arc;

/// Structured, in-process event hook for observability.
///
/// This crate is a library; emitting logs directly (e.g. `println!`) is not
/// acceptable for production. Instead, callers can provide an implementation
/// that forwards these events to `tracing`, `log`, metrics, or custom sinks.
pub trait StoreEventListener: std::fmt::Debug + Send + Sync + 'static {
    fn on_event(&self, event: StoreEvent);
}

/// Which store a sweeper event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTarget {
    Metrics,
    Events,
}

/// Structured events emitted by the core.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    SweeperStarted { target: SweepTarget },
    SweeperStopping { target: SweepTarget },
    SweepCompleted { target: SweepTarget, removed: usize },
    SweepFailed { target: SweepTarget, error: String },
}

#[derive(Debug)]
pub struct NoopEventListener;

impl StoreEventListener for NoopEventListener {
    #[inline]
    fn on_event(&self, _event: StoreEvent) {}
}

pub fn noop_event_listener() -> Arc<dyn StoreEventListener> {
    Arc::new(NoopEventListener)
}

/// Operational metrics instrumentation via the `metrics` facade.
///
/// Library-safe: every recording call is effectively a no-op until the
/// embedding process installs a recorder. Call [`op_metrics::describe_all`]
/// once at startup to register units and help text with the recorder.
pub mod op_metrics {
    use std::time::Duration;

    use ::metrics::{describe_counter, describe_histogram, Unit};

    // --- metric names ---
    //
    // Counters are exposed as `<name>_total` by Prometheus-style exporters.

    pub const INGEST_POINTS: &str = "telem_ingest_points";
    pub const INGEST_EXEC_EVENTS: &str = "telem_ingest_exec_events";
    pub const SWEEP_REMOVED_ITEMS: &str = "telem_sweep_removed_items";
    pub const SWEEP_DURATION_SECONDS: &str = "telem_sweep_duration_seconds";

    #[inline]
    pub fn record_ingest_point() {
        ::metrics::counter!(INGEST_POINTS).increment(1);
    }

    #[inline]
    pub fn record_ingest_exec_event() {
        ::metrics::counter!(INGEST_EXEC_EVENTS).increment(1);
    }

    #[inline]
    pub fn record_sweep(duration: Duration, removed: u64) {
        ::metrics::histogram!(SWEEP_DURATION_SECONDS).record(duration.as_secs_f64());
        if removed > 0 {
            ::metrics::counter!(SWEEP_REMOVED_ITEMS).increment(removed);
        }
    }

    pub fn describe_all() {
        describe_counter!(
            INGEST_POINTS,
            Unit::Count,
            "Total number of metric points accepted by the store."
        );
        describe_counter!(
            INGEST_EXEC_EVENTS,
            Unit::Count,
            "Total number of exec events accepted by the event log."
        );
        describe_counter!(
            SWEEP_REMOVED_ITEMS,
            Unit::Count,
            "Total number of points and events evicted by expiry sweeps."
        );
        describe_histogram!(
            SWEEP_DURATION_SECONDS,
            Unit::Seconds,
            "Duration of a single expiry sweep pass."
        );
    }
}
