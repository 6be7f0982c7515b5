use crate::error::StoreError;
use crate::types::{MetricPoint, SeriesStats, Timestamp};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store of all metric series: a map from series name to its
/// ordered sequence of samples, behind a single reader/writer lock.
///
/// Appends and sweeps take the exclusive lock; aggregate queries take the
/// shared lock, so concurrent `stats` and `rate` calls do not block each
/// other. Everything a query returns is a snapshot decoupled from live
/// state. A series key, once observed, is never removed; expiry only drains
/// its sequence.
#[derive(Debug, Default)]
pub struct MetricStore {
    series: RwLock<HashMap<String, Vec<MetricPoint>>>,
}

impl MetricStore {
    /// Appends a sample to its series, creating the series if absent.
    ///
    /// No validation of the value range; NaN and infinities are accepted and
    /// propagate into aggregates.
    pub fn add(&self, point: MetricPoint) -> Result<(), StoreError> {
        let mut series = self.series.write()?;
        series.entry(point.name.clone()).or_default().push(point);
        Ok(())
    }

    /// Computes count/sum/max/avg for every series currently present.
    ///
    /// The sum is a plain uncompensated float sum: order-dependent in
    /// general, but deterministic for a given snapshot because each series
    /// is folded in insertion order. Runs under the shared lock; per-series
    /// work is spread across the rayon pool.
    pub fn stats(&self) -> Result<HashMap<String, SeriesStats>, StoreError> {
        let series = self.series.read()?;
        let result = series
            .par_iter()
            .map(|(name, points)| (name.clone(), aggregate(points)))
            .collect();
        Ok(result)
    }

    /// Computes the approximate events-per-second rate for every series over
    /// the trailing `window_secs` seconds, relative to `now`.
    ///
    /// `now` is supplied by the caller, sampled once before this call takes
    /// the lock, which bounds the whole query to a single instant. A
    /// zero or negative window is rejected rather than dividing by zero.
    pub fn rate(
        &self,
        window_secs: i64,
        now: Timestamp,
    ) -> Result<HashMap<String, f64>, StoreError> {
        if window_secs <= 0 {
            return Err(StoreError::InvalidWindow {
                window: window_secs,
            });
        }
        let series = self.series.read()?;
        let result = series
            .par_iter()
            .map(|(name, points)| {
                let count = points
                    .iter()
                    .filter(|p| now - p.timestamp <= window_secs)
                    .count();
                (name.clone(), count as f64 / window_secs as f64)
            })
            .collect();
        Ok(result)
    }

    /// Evicts every sample older than `ttl_secs`, keeping series keys.
    ///
    /// Eviction is monotonic: decided solely by `now - timestamp > ttl_secs`,
    /// and an evicted sample cannot reappear. Returns the number of evicted
    /// samples.
    pub fn sweep(&self, now: Timestamp, ttl_secs: i64) -> Result<usize, StoreError> {
        let mut series = self.series.write()?;
        let mut removed = 0;
        for points in series.values_mut() {
            let before = points.len();
            points.retain(|p| now - p.timestamp <= ttl_secs);
            removed += before - points.len();
        }
        Ok(removed)
    }

    /// Number of series keys currently present, drained ones included.
    pub fn series_count(&self) -> Result<usize, StoreError> {
        Ok(self.series.read()?.len())
    }
}

/// Folds one series' samples into its aggregates.
///
/// `max` starts at negative infinity, so an empty series reports `-inf`; a
/// NaN value never wins the `>` comparison but still poisons `sum` and
/// `avg`. Zero-count average is defined as 0 rather than NaN.
fn aggregate(points: &[MetricPoint]) -> SeriesStats {
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    for p in points {
        sum += p.value;
        if p.value > max {
            max = p.value;
        }
    }
    let count = points.len();
    let avg = if count == 0 { 0.0 } else { sum / count as f64 };
    SeriesStats {
        count,
        sum,
        max,
        avg,
    }
}
