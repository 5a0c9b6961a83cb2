//! Background edge capture.
//!
//! Spawns a thread that owns the `QuadratureSensor` and the single
//! `EdgeCapture`, feeding every edge the sensor reports into the shared state.
//! Sensor faults are reported through a bounded channel.
//!
//! Each `CaptureThread` spawns exactly one thread that is shut down and
//! joined when the `CaptureThread` is dropped.
use crossbeam_channel as xch;
use quadspeed_traits::{QuadratureSensor, TickSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::capture::EdgeCapture;
use crate::error::SpeedoError;
use crate::hw_error::map_hw_error;

/// Consecutive sensor errors tolerated before the thread gives up.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 8;

pub struct CaptureThread {
    faults: xch::Receiver<SpeedoError>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl CaptureThread {
    /// Start capturing. `edge_timeout` bounds how long one wait may block and
    /// therefore how quickly the thread notices shutdown.
    pub fn spawn<S, T>(mut sensor: S, mut capture: EdgeCapture<T>, edge_timeout: Duration) -> Self
    where
        S: QuadratureSensor + Send + 'static,
        T: TickSource + Send + 'static,
    {
        let (tx, faults) = xch::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            match sensor.read_channels() {
                Ok((a, b)) => capture.prime(a, b),
                Err(e) => tracing::warn!(error = %e, "could not read initial channel levels"),
            }

            let mut consecutive_errors: u32 = 0;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("capture thread received shutdown signal");
                    break;
                }

                let result = match sensor.wait_for_edge(edge_timeout) {
                    Ok(true) => capture.try_on_edge(|| sensor.read_channels()).map(Some),
                    Ok(false) => Ok(None),
                    Err(e) => Err(e),
                };

                match result {
                    Ok(outcome) => {
                        consecutive_errors = 0;
                        if let Some(outcome) = outcome {
                            tracing::trace!(?outcome, edges = capture.edge_count(), "edge");
                        }
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        let err = map_hw_error(e.as_ref());
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            tracing::error!(error = %err, retries = consecutive_errors, "sensor failed, capture stopping");
                            // receiver gone means nobody is left to tell
                            let _ = tx.try_send(err);
                            break;
                        }
                        tracing::warn!(error = %err, retries = consecutive_errors, "sensor error, retrying");
                    }
                }
            }
            tracing::trace!(
                edges = capture.edge_count(),
                interrupts = capture.interrupt_count(),
                rejected = capture.rejected_count(),
                "capture thread exiting cleanly"
            );
        });

        Self {
            faults,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Fault that stopped the thread, if any. Reported once.
    pub fn take_fault(&self) -> Option<SpeedoError> {
        self.faults.try_recv().ok()
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits after its current wait, at most `edge_timeout`.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("capture thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "capture thread panicked during shutdown");
                }
            }
        }
    }
}
