use crate::error::StoreError;
use crate::types::{ExecEvent, Timestamp};
use std::sync::Mutex;

/// Flat, unpartitioned log of exec events behind its own exclusive lock.
///
/// Deliberately independent from the metric store's lock: the two have
/// different write/read patterns and no reason to contend. Reads also take
/// the exclusive lock; event volume is expected to be low enough that a
/// reader/writer split is not worth the coupling.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ExecEvent>>,
}

impl EventLog {
    /// Appends an event in arrival order.
    pub fn add(&self, event: ExecEvent) -> Result<(), StoreError> {
        let mut events = self.events.lock()?;
        events.push(event);
        Ok(())
    }

    /// Returns a defensive copy of the full log in insertion order.
    pub fn snapshot(&self) -> Result<Vec<ExecEvent>, StoreError> {
        let events = self.events.lock()?;
        Ok(events.clone())
    }

    /// Evicts every event older than `ttl_secs`; returns the evicted count.
    pub fn sweep(&self, now: Timestamp, ttl_secs: i64) -> Result<usize, StoreError> {
        let mut events = self.events.lock()?;
        let before = events.len();
        events.retain(|e| now - e.timestamp <= ttl_secs);
        Ok(before - events.len())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.events.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.events.lock()?.is_empty())
    }
}
