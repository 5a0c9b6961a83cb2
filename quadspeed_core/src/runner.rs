use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use quadspeed_traits::{Clock, Display, DisplayFrame, TickSource};

use crate::capture_thread::CaptureThread;
use crate::error::{Report, Result as CoreResult, SpeedoError};
use crate::estimator::Speedometer;
use crate::hw_error::map_display_error;
use crate::status::UpdateOutcome;

/// When the periodic loop should end.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after this long; `None` runs until shutdown.
    pub max_duration: Option<Duration>,
}

/// Counters gathered over a run or replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub updates: u64,
    pub deferrals: u64,
    pub stops: u64,
    /// Highest filtered RPM published.
    pub peak_rpm: f32,
    pub edges: u32,
    pub interrupts: u32,
    pub rejected: u32,
    pub final_frame: DisplayFrame,
}

impl RunSummary {
    pub(crate) fn new(initial: DisplayFrame) -> Self {
        Self {
            cycles: 0,
            updates: 0,
            deferrals: 0,
            stops: 0,
            peak_rpm: 0.0,
            edges: 0,
            interrupts: 0,
            rejected: 0,
            final_frame: initial,
        }
    }

    pub(crate) fn tally(&mut self, outcome: &UpdateOutcome) {
        self.cycles += 1;
        match outcome {
            UpdateOutcome::Updated(m) => {
                self.updates += 1;
                self.peak_rpm = self.peak_rpm.max(m.rpm);
            }
            UpdateOutcome::Deferred(_) => self.deferrals += 1,
            UpdateOutcome::Stopped => self.stops += 1,
        }
    }

    pub(crate) fn finish<T: TickSource>(&mut self, meter: &Speedometer<T>) {
        self.edges = meter.edge_count();
        self.interrupts = meter.interrupt_count();
        self.rejected = meter.rejected_count();
        self.final_frame = meter.frame();
    }
}

/// Drive `meter.update()` at its configured rate, handing each frame to
/// `display`, until `shutdown` is set or the optional duration elapses.
///
/// The capture thread is checked every cycle; a sensor fault ends the run
/// with an error.
pub fn run<T, D, C>(
    capture: &CaptureThread,
    meter: &mut Speedometer<T>,
    display: &mut D,
    clock: &C,
    opts: RunOptions,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary>
where
    T: TickSource,
    D: Display + ?Sized,
    C: Clock,
{
    let period = Duration::from_micros(crate::util::period_us(meter.update_hz()));
    let start = clock.now();
    let mut next = start + period;
    let mut summary = RunSummary::new(meter.frame());

    tracing::info!(
        update_hz = meter.update_hz(),
        max_duration_ms = opts.max_duration.map(|d| d.as_millis() as u64),
        "measurement start"
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if let Some(max) = opts.max_duration
            && clock.now().saturating_duration_since(start) >= max
        {
            break;
        }
        if let Some(fault) = capture.take_fault() {
            tracing::error!(error = %fault, "measurement aborted");
            return Err(Report::new(fault));
        }
        if !capture.is_running() {
            // the fault is sent before the thread exits
            if let Some(fault) = capture.take_fault() {
                return Err(Report::new(fault));
            }
            return Err(Report::new(SpeedoError::CaptureStopped(
                "capture thread exited unexpectedly".into(),
            )));
        }

        let outcome = meter.update();
        summary.tally(&outcome);
        display
            .show(&meter.frame())
            .map_err(|e| Report::new(map_display_error(e.as_ref())))?;

        next = pace(clock, next, period);
    }

    summary.finish(meter);
    tracing::info!(
        cycles = summary.cycles,
        updates = summary.updates,
        stops = summary.stops,
        edges = summary.edges,
        rejected = summary.rejected,
        "measurement finished"
    );
    Ok(summary)
}

/// Sleep until `next` and return the following deadline. A loop that fell
/// more than one period behind restarts its schedule from now.
fn pace<C: Clock>(clock: &C, next: Instant, period: Duration) -> Instant {
    if clock.sleep_until(next) {
        return next + period;
    }
    let now = clock.now();
    if now.saturating_duration_since(next) > period {
        tracing::debug!(
            behind_us = now.saturating_duration_since(next).as_micros() as u64,
            "estimation loop overran, resyncing"
        );
        now + period
    } else {
        next + period
    }
}
