//! Collector core: single owner of the metric store, the event log, the
//! clock, and both background expiry sweepers.

use crate::clock::{system_clock, Clock};
use crate::error::StoreError;
use crate::events::EventLog;
use crate::store::MetricStore;
use crate::sweeper::Sweeper;
use crate::telemetry::{noop_event_listener, op_metrics, StoreEventListener, SweepTarget};
use crate::types::{ExecEvent, MetricPoint, SeriesStats, Timestamp};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Configuration options for the Collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Maximum age of a metric point before it is eligible for eviction.
    pub metric_ttl: Duration,
    /// Interval between metric expiry passes. Independent from the TTL;
    /// controls sweep frequency only, never the age threshold.
    pub metric_sweep_interval: Duration,
    /// Maximum age of an exec event before it is eligible for eviction.
    pub event_ttl: Duration,
    /// Interval between event expiry passes.
    pub event_sweep_interval: Duration,
    /// Wall-clock source used to stamp and age out data.
    pub clock: Arc<dyn Clock>,
    /// Structured event hook for observability (no-op by default).
    pub event_listener: Arc<dyn StoreEventListener>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            metric_ttl: crate::DEFAULT_METRIC_TTL,
            metric_sweep_interval: crate::DEFAULT_METRIC_SWEEP_INTERVAL,
            event_ttl: crate::DEFAULT_EVENT_TTL,
            event_sweep_interval: crate::DEFAULT_EVENT_SWEEP_INTERVAL,
            clock: system_clock(),
            event_listener: noop_event_listener(),
        }
    }
}

/// The collector core.
///
/// Explicitly constructed once at startup and passed by reference to
/// whichever component wires up the network boundary; there is no process-
/// global instance. Dropping it stops both sweepers and joins their threads.
#[derive(Debug)]
pub struct Collector {
    metrics: Arc<MetricStore>,
    events: Arc<EventLog>,
    metric_sweeper: Sweeper,
    event_sweeper: Sweeper,
    clock: Arc<dyn Clock>,
    config: CollectorConfig,
}

impl Collector {
    /// Creates a new `Collector` and spawns both expiry sweepers.
    ///
    /// # Errors
    /// Returns an error if a sweeper thread cannot be spawned.
    pub fn with_config(config: CollectorConfig) -> Result<Self, StoreError> {
        let metrics = Arc::new(MetricStore::default());
        let events = Arc::new(EventLog::default());

        let store = Arc::clone(&metrics);
        let clock = Arc::clone(&config.clock);
        let ttl_secs = config.metric_ttl.as_secs() as i64;
        let metric_sweeper = Sweeper::spawn(
            SweepTarget::Metrics,
            config.metric_sweep_interval,
            Arc::clone(&config.event_listener),
            move || store.sweep(clock.now_secs(), ttl_secs),
        )?;

        let log = Arc::clone(&events);
        let clock = Arc::clone(&config.clock);
        let ttl_secs = config.event_ttl.as_secs() as i64;
        let event_sweeper = Sweeper::spawn(
            SweepTarget::Events,
            config.event_sweep_interval,
            Arc::clone(&config.event_listener),
            move || log.sweep(clock.now_secs(), ttl_secs),
        )?;

        Ok(Collector {
            metrics,
            events,
            metric_sweeper,
            event_sweeper,
            clock: Arc::clone(&config.clock),
            config,
        })
    }

    /// Appends a metric sample. Thread-safe; accepts all submitted points
    /// unconditionally (the adapter boundary validates before calling).
    pub fn add_metric(&self, point: MetricPoint) -> Result<(), StoreError> {
        self.metrics.add(point)?;
        op_metrics::record_ingest_point();
        Ok(())
    }

    /// Returns a snapshot of count/sum/max/avg for every known series.
    pub fn stats(&self) -> Result<HashMap<String, SeriesStats>, StoreError> {
        self.metrics.stats()
    }

    /// Returns per-series events-per-second over the trailing window.
    ///
    /// The clock is sampled exactly once, before any lock is taken, so the
    /// whole query is bound to a single instant.
    pub fn rate(&self, window_secs: i64) -> Result<HashMap<String, f64>, StoreError> {
        let now = self.clock.now_secs();
        self.metrics.rate(window_secs, now)
    }

    /// Appends an exec event.
    pub fn add_exec(&self, event: ExecEvent) -> Result<(), StoreError> {
        self.events.add(event)?;
        op_metrics::record_ingest_exec_event();
        Ok(())
    }

    /// Returns a copy of the full event log in insertion order.
    pub fn exec_events(&self) -> Result<Vec<ExecEvent>, StoreError> {
        self.events.snapshot()
    }

    /// Current time from the configured clock, for adapter-side timestamp
    /// defaulting.
    pub fn now(&self) -> Timestamp {
        self.clock.now_secs()
    }

    /// Runs a metric expiry sweep immediately; returns the evicted count.
    ///
    /// # Errors
    /// Returns an error if the sweeper thread cannot be reached.
    pub fn sweep_metrics(&self) -> Result<usize, StoreError> {
        self.metric_sweeper.sweep_now()
    }

    /// Runs an event expiry sweep immediately; returns the evicted count.
    ///
    /// # Errors
    /// Returns an error if the sweeper thread cannot be reached.
    pub fn sweep_events(&self) -> Result<usize, StoreError> {
        self.event_sweeper.sweep_now()
    }

    /// Returns a reference to the configuration this collector was built with.
    pub fn get_config(&self) -> &CollectorConfig {
        &self.config
    }
}

/// Default implementation uses the default TTLs and sweep intervals.
impl Default for Collector {
    fn default() -> Self {
        Self::with_config(CollectorConfig::default())
            .expect("Failed to initialize Collector with default configuration")
    }
}
