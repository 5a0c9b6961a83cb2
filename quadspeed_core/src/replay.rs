//! Deterministic replay of recorded edge traces.
//!
//! A trace is a list of `(ticks, a, b)` rows sampled by a real capture. The
//! replayer drives a `ManualTicks` counter through the recorded values,
//! interleaving estimation cycles at the configured cadence in tick time, so
//! the same trace always yields the same frames.
use quadspeed_config::TraceRow;
use quadspeed_traits::{Display, ManualTicks, counter_mask, ticks::duration_to_ticks};

use crate::capture::EdgeCapture;
use crate::config::MeterCfg;
use crate::error::{Report, Result, SpeedoError};
use crate::estimator::Speedometer;
use crate::hw_error::map_display_error;
use crate::runner::RunSummary;
use crate::status::UpdateOutcome;
use crate::timebase::elapsed_ticks;
use crate::util::period_ticks;

struct Replayer<'d, D: Display + ?Sized> {
    ticks: ManualTicks,
    meter: Speedometer<ManualTicks>,
    display: &'d mut D,
    every: u64,
    origin: u32,
    mask: u32,
    summary: RunSummary,
}

impl<D: Display + ?Sized> Replayer<'_, D> {
    /// Run one cycle with the counter positioned `at` ticks after the origin.
    fn cycle(&mut self, at: u64) -> Result<UpdateOutcome> {
        self.ticks
            .set(self.origin.wrapping_sub(at as u32) & self.mask);
        let outcome = self.meter.update();
        self.summary.tally(&outcome);
        if self.summary.cycles % self.every == 0 {
            self.display
                .show(&self.meter.frame())
                .map_err(|e| Report::new(map_display_error(e.as_ref())))?;
        }
        Ok(outcome)
    }
}

/// Replay `rows` through a fresh meter built from `cfg`.
///
/// Every `every`-th cycle (at least 1) is shown on `display`. After the last
/// edge the replay keeps cycling until the meter reports a stop, so the final
/// frame reflects the shaft at rest.
pub fn replay<D: Display + ?Sized>(
    rows: &[TraceRow],
    cfg: &MeterCfg,
    every: usize,
    display: &mut D,
) -> Result<RunSummary> {
    let Some(first) = rows.first() else {
        return Err(Report::new(SpeedoError::Config("trace has no edges".into())));
    };
    let tb = cfg.timebase;
    let ticks = ManualTicks::new(first.ticks, tb.frequency_hz, tb.width_bits);
    let (mut capture, meter): (EdgeCapture<ManualTicks>, _) = Speedometer::builder()
        .ticks(ticks.clone())
        .config(cfg)
        .build()?;

    let period = period_ticks(cfg.estimator.update_hz, tb.frequency_hz);
    // the stop lands on the first cycle after the timeout, plus one for the
    // cycle that consumes the last edge
    let tail = duration_to_ticks(cfg.estimator.stopped_timeout, tb.frequency_hz) + 2 * period;
    let mask = counter_mask(tb.width_bits);

    tracing::info!(
        edges = rows.len(),
        period_ticks = period,
        "replay start"
    );

    let initial = meter.frame();
    let mut r = Replayer {
        ticks,
        meter,
        display,
        every: every.max(1) as u64,
        origin: first.ticks & mask,
        mask,
        summary: RunSummary::new(initial),
    };

    let mut prev = r.origin;
    let mut abs: u64 = 0;
    let mut next_update = period;
    for row in rows {
        let t = row.ticks & mask;
        abs += u64::from(elapsed_ticks(prev, t, mask));
        prev = t;
        while next_update <= abs {
            r.cycle(next_update)?;
            next_update += period;
        }
        r.ticks.set(t);
        let (a, b) = row.levels();
        let outcome = capture.on_edge(|| (a, b));
        tracing::trace!(ticks = t, ?outcome, "replayed edge");
    }

    let end = abs + tail;
    while next_update <= end {
        let outcome = r.cycle(next_update)?;
        next_update += period;
        if outcome == UpdateOutcome::Stopped {
            break;
        }
    }

    let mut summary = r.summary;
    summary.finish(&r.meter);
    tracing::info!(
        cycles = summary.cycles,
        updates = summary.updates,
        edges = summary.edges,
        rejected = summary.rejected,
        "replay finished"
    );
    Ok(summary)
}
