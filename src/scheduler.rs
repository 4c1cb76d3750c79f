//! Periodic background tasks
//!
//! Two independent timers run on one background thread, decoupled from
//! any rendering loop: a short-period tick samples the data source's
//! connection state and server time into a shared snapshot, and a
//! longer-period tick runs the sink's retention sweep using the last
//! sampled server time as its reference.
//!
//! The thread parks in a `crossbeam_channel::select!` over the two
//! tickers and a stop channel; [`PeriodicScheduler::stop`] (also run on
//! drop) shuts it down and joins it.

use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

use crate::sink::DataSink;
use crate::source::DataSource;
use crate::types::ConnectionState;

/// Scheduler tick intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Interval between connection-status samples
    pub status_interval: Duration,
    /// Interval between retention sweeps
    pub retention_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(1000),
            retention_interval: Duration::from_millis(30_000),
        }
    }
}

/// Last-sampled connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Connection state of the data source
    pub state: ConnectionState,
    /// Server time in microseconds, if known
    pub server_time_microseconds: Option<i64>,
    /// Network latency in microseconds, if known
    pub network_latency_microseconds: Option<i64>,
}

/// Shared cell holding the latest [`StatusSnapshot`].
///
/// The scheduler writes it once per status tick; the UI layer reads it at
/// whatever cadence it likes.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl SharedStatus {
    /// Create a cell holding the default (disconnected) snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the latest snapshot.
    pub fn get(&self) -> StatusSnapshot {
        *self.inner.read().expect("status lock poisoned")
    }

    fn set(&self, snapshot: StatusSnapshot) {
        *self.inner.write().expect("status lock poisoned") = snapshot;
    }
}

/// Background thread driving status sampling and retention sweeps
pub struct PeriodicScheduler {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicScheduler {
    /// Spawn the scheduler thread.
    pub fn spawn(
        sink: Arc<DataSink>,
        source: Arc<Mutex<dyn DataSource>>,
        status: SharedStatus,
        options: SchedulerOptions,
    ) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = std::thread::spawn(move || {
            let status_tick = tick(options.status_interval);
            let retention_tick = tick(options.retention_interval);

            loop {
                select! {
                    recv(status_tick) -> _ => {
                        let snapshot = {
                            let source = source.lock().expect("source lock poisoned");
                            StatusSnapshot {
                                state: source.state(),
                                server_time_microseconds: source.server_time_microseconds(),
                                network_latency_microseconds: source.network_latency_microseconds(),
                            }
                        };
                        status.set(snapshot);
                    }
                    recv(retention_tick) -> _ => {
                        let reference = status
                            .get()
                            .server_time_microseconds
                            .unwrap_or(0);
                        sink.enforce_retention(reference);
                    }
                    recv(stop_rx) -> _ => break,
                }
            }

            tracing::debug!("scheduler stopped");
        });

        Self {
            stop: stop_tx,
            handle: Some(handle),
        }
    }

    /// Stop the scheduler and join its thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
