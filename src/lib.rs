#![doc = include_str!("../README.md")]
// Declare modules
pub mod clock;
pub mod core;
pub mod error;
pub mod events;
pub mod store;
pub mod sweeper;
pub mod telemetry;
pub mod types;

/// Wall-clock seam used to stamp and age out data.
pub use crate::clock::{system_clock, Clock, ManualClock, SystemClock};
/// Configuration options for the collector core.
pub use crate::core::CollectorConfig;
/// Main entry point for interacting with the collector core.
pub use crate::core::Collector;
/// Error type for store and collector operations.
pub use crate::error::StoreError;
/// Time-windowed log of exec events.
pub use crate::events::EventLog;
/// In-memory store of metric series.
pub use crate::store::MetricStore;
/// Handle to a background expiry sweeper.
pub use crate::sweeper::Sweeper;
/// Structured event hook for observability.
pub use crate::telemetry::{noop_event_listener, StoreEvent, StoreEventListener, SweepTarget};
/// Represents a discrete process-execution event.
pub use crate::types::ExecEvent;
/// Represents a single metric sample.
pub use crate::types::MetricPoint;
/// Aggregates derived from one series' retained samples.
pub use crate::types::SeriesStats;
/// Type alias for a timestamp (whole seconds since epoch).
pub use crate::types::Timestamp;
/// Type alias for a sample value (f64).
pub use crate::types::Value;

use std::time::Duration;
/// Default retention for metric points (60 seconds).
pub const DEFAULT_METRIC_TTL: Duration = Duration::from_secs(60);
/// Default interval between metric expiry sweeps (30 seconds).
pub const DEFAULT_METRIC_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
/// Default retention for exec events (5 minutes).
pub const DEFAULT_EVENT_TTL: Duration = Duration::from_secs(300);
/// Default interval between event expiry sweeps (60 seconds).
pub const DEFAULT_EVENT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
