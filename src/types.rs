use serde::{Deserialize, Serialize};

/// Timestamp type (whole seconds since the Unix epoch).
pub type Timestamp = i64;

/// Value type.
pub type Value = f64;

/// A single numeric sample submitted to a named series.
///
/// Identity is positional within its series; duplicate name+timestamp pairs
/// are permitted. A `timestamp` of zero means "unset" on the wire; the
/// ingress adapter stamps the current time before the point reaches the
/// store, and the store never mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub timestamp: Timestamp,
}

/// A discrete process-execution event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEvent {
    pub name: String,
    #[serde(default)]
    pub timestamp: Timestamp,
    pub pid: u32,
    pub uid: u32,
}

/// Aggregates derived from a series' currently retained samples.
///
/// Recomputed from raw points on every query, never stored. `max` is seeded
/// at negative infinity, so an empty series reports `max = -inf`; `avg` is
/// defined as 0 when `count` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub sum: Value,
    pub max: Value,
    pub avg: Value,
}
