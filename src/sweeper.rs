//! Background expiry sweeper: a cancellable periodic task driving a sweep
//! closure, with on-demand acked sweeps for deterministic tests.

use crate::error::StoreError;
use crate::telemetry::{op_metrics, StoreEvent, StoreEventListener, SweepTarget};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Commands sent to the background sweeper thread.
enum SweepCommand {
    Sweep {
        ack: Option<mpsc::Sender<Result<usize, StoreError>>>,
    },
    Shutdown,
}

/// Handle to one background expiry sweeper.
///
/// The thread runs the sweep closure every `interval` (or on demand via
/// [`Sweeper::sweep_now`]) until it receives `Shutdown` or its command
/// channel disconnects. Dropping the handle shuts the thread down and joins
/// it, so a sweep tick in flight always runs to completion.
#[derive(Debug)]
pub struct Sweeper {
    cmd_tx: mpsc::Sender<SweepCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub(crate) fn spawn<F>(
        target: SweepTarget,
        interval: Duration,
        events: Arc<dyn StoreEventListener>,
        sweep_fn: F,
    ) -> Result<Self, StoreError>
    where
        F: Fn() -> Result<usize, StoreError> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<SweepCommand>();
        let thread_name = match target {
            SweepTarget::Metrics => "telem-metric-sweeper",
            SweepTarget::Events => "telem-event-sweeper",
        };

        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                events.on_event(StoreEvent::SweeperStarted { target });

                let run_sweep = |ack: Option<mpsc::Sender<Result<usize, StoreError>>>| {
                    let started = Instant::now();
                    let result = sweep_fn();
                    match &result {
                        Ok(removed) => {
                            op_metrics::record_sweep(started.elapsed(), *removed as u64);
                            events.on_event(StoreEvent::SweepCompleted {
                                target,
                                removed: *removed,
                            });
                        }
                        Err(e) => events.on_event(StoreEvent::SweepFailed {
                            target,
                            error: e.to_string(),
                        }),
                    }
                    if let Some(ack) = ack {
                        let _ = ack.send(result);
                    }
                };

                loop {
                    match cmd_rx.recv_timeout(interval) {
                        Ok(SweepCommand::Sweep { ack }) => run_sweep(ack),
                        Err(mpsc::RecvTimeoutError::Timeout) => run_sweep(None),
                        Ok(SweepCommand::Shutdown)
                        | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            events.on_event(StoreEvent::SweeperStopping { target });
                            break;
                        }
                    }
                }
            })
            .map_err(|e| {
                StoreError::BackgroundTaskError(format!("Failed to spawn sweeper thread: {}", e))
            })?;

        Ok(Sweeper {
            cmd_tx,
            handle: Some(handle),
        })
    }

    /// Runs one sweep immediately and waits for its result (evicted count).
    pub fn sweep_now(&self) -> Result<usize, StoreError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(SweepCommand::Sweep { ack: Some(tx) })
            .map_err(|e| {
                StoreError::BackgroundTaskError(format!("Failed to send sweep command: {}", e))
            })?;
        rx.recv().map_err(|e| {
            StoreError::BackgroundTaskError(format!("Failed to receive sweep ack: {}", e))
        })?
    }

    fn shutdown(&mut self) {
        // Ignore send errors; the thread may already have stopped.
        let _ = self.cmd_tx.send(SweepCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::noop_event_listener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_sweep_now_returns_closure_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let sweeper = Sweeper::spawn(
            SweepTarget::Metrics,
            Duration::from_secs(3600),
            noop_event_listener(),
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            },
        )
        .unwrap();

        assert_eq!(sweeper.sweep_now().unwrap(), 7);
        assert_eq!(sweeper.sweep_now().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_periodic_tick_runs_without_commands() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sweeper = Sweeper::spawn(
            SweepTarget::Events,
            Duration::from_millis(10),
            noop_event_listener(),
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        assert!(calls.load(Ordering::SeqCst) >= 1, "tick never fired");
    }

    #[test]
    fn test_drop_joins_the_thread() {
        let sweeper = Sweeper::spawn(
            SweepTarget::Metrics,
            Duration::from_millis(5),
            noop_event_listener(),
            || Ok(0),
        )
        .unwrap();
        drop(sweeper); // must not hang or panic
    }

    #[test]
    fn test_sweep_error_is_propagated_to_ack() {
        let sweeper = Sweeper::spawn(
            SweepTarget::Metrics,
            Duration::from_secs(3600),
            noop_event_listener(),
            || Err(StoreError::LockError("poisoned".to_string())),
        )
        .unwrap();

        match sweeper.sweep_now() {
            Err(StoreError::LockError(msg)) => assert!(msg.contains("poisoned")),
            other => panic!("expected LockError, got {:?}", other),
        }
    }
}
