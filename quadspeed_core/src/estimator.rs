//! Windowed rate estimation.
//!
//! Each `update` takes one snapshot of the shared state and compares it with
//! the previous accepted snapshot (the baseline). Edges accumulated since the
//! baseline divided by the ticks elapsed since it give the rate; the baseline
//! only advances when a window is actually consumed, so no edge is counted
//! twice or skipped.
use std::sync::Arc;

use quadspeed_config::SpeedUnit;
use quadspeed_traits::{Direction, DisplayFrame, TickSource};
use tracing::{debug, info, trace};

use crate::direction::DirectionResolver;
use crate::filter::{MovingAverage, RPM_FILTER_DEPTH, SPEED_FILTER_DEPTH};
use crate::readout::{Readout, ReadoutHandle};
use crate::shared::{SharedMeasurement, Snapshot};
use crate::status::{DeferReason, Measurement, UpdateOutcome};
use crate::timebase::{TimeBase, Ticks};

#[derive(Debug, Clone, Copy)]
struct Baseline {
    edges: u32,
    at: Ticks,
}

/// Limits derived from configuration, in the units `update` works in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EstimatorParams {
    pub edges_per_rotation: f64,
    pub circumference_m: f64,
    pub min_window: u64,
    pub stopped_timeout: u64,
    pub max_rpm: f32,
    pub max_speed: f32,
    pub unit: SpeedUnit,
    pub update_hz: u32,
}

/// The estimation side of a meter: call `update` once per period.
#[derive(Debug)]
pub struct Speedometer<T> {
    timebase: TimeBase<T>,
    shared: Arc<SharedMeasurement>,
    readout: ReadoutHandle,
    params: EstimatorParams,
    baseline: Baseline,
    speed_filter: MovingAverage<SPEED_FILTER_DEPTH>,
    rpm_filter: MovingAverage<RPM_FILTER_DEPTH>,
    resolver: DirectionResolver,
    last_speed: f32,
    stopped: bool,
}

impl<T: TickSource> Speedometer<T> {
    pub(crate) fn new(
        timebase: TimeBase<T>,
        shared: Arc<SharedMeasurement>,
        params: EstimatorParams,
        direction_threshold: i32,
    ) -> Self {
        let start = shared.snapshot(&timebase);
        Self {
            timebase,
            shared,
            readout: ReadoutHandle::new(Arc::new(Readout::default()), params.unit),
            params,
            baseline: Baseline {
                edges: start.edge_count,
                at: start.now,
            },
            speed_filter: MovingAverage::new(),
            rpm_filter: MovingAverage::new(),
            resolver: DirectionResolver::new(direction_threshold),
            last_speed: 0.0,
            stopped: true,
        }
    }

    /// Run one estimation cycle.
    pub fn update(&mut self) -> UpdateOutcome {
        let snap = self.shared.snapshot(&self.timebase);
        let window = self.timebase.elapsed(self.baseline.at, snap.now);

        if u64::from(window) < self.params.min_window {
            trace!(window_ticks = window, "window too short");
            return UpdateOutcome::Deferred(DeferReason::WindowTooShort);
        }

        let edges = snap.edge_count.wrapping_sub(self.baseline.edges);
        if edges == 0 {
            // in motion the last accepted edge predates the baseline; once
            // stopped its stamp may be older than a counter wrap
            let idle = if self.stopped {
                window
            } else {
                window.max(self.timebase.elapsed(snap.last_edge, snap.now))
            };
            if u64::from(idle) >= self.params.stopped_timeout {
                self.stop(&snap);
                return UpdateOutcome::Stopped;
            }
            trace!(window_ticks = window, "awaiting edges");
            return UpdateOutcome::Deferred(DeferReason::AwaitingEdges);
        }

        let m = self.measure(edges, window, snap.votes);
        self.baseline = Baseline {
            edges: snap.edge_count,
            at: snap.now,
        };
        if self.stopped {
            self.stopped = false;
            info!(rpm = m.raw_rpm, direction = %m.direction, "motion detected");
        }
        trace!(
            edges,
            window_s = m.window_s,
            raw_rpm = m.raw_rpm,
            raw_speed = m.raw_speed,
            rpm = m.rpm,
            speed = m.speed,
            votes = snap.votes,
            "cycle"
        );
        UpdateOutcome::Updated(m)
    }

    fn measure(&mut self, edges: u32, window: u32, votes: i32) -> Measurement {
        let p = &self.params;
        let window_s = self.timebase.ticks_to_secs(window);
        let rotations = f64::from(edges) / p.edges_per_rotation;

        let raw_rpm = ((rotations / window_s * 60.0) as f32).min(p.max_rpm);
        let distance_m = rotations * p.circumference_m;
        let computed_speed = (distance_m / window_s * p.unit.per_mps()) as f32;
        let speed_held = computed_speed.is_nan() || computed_speed > p.max_speed;
        let raw_speed = if speed_held {
            debug!(
                speed = computed_speed,
                held = self.last_speed,
                "implausible speed, holding previous"
            );
            self.last_speed
        } else {
            self.last_speed = computed_speed;
            computed_speed
        };

        self.readout.store().add_distance(distance_m);
        self.speed_filter.push(raw_speed);
        self.rpm_filter.push(raw_rpm);
        let speed = self.speed_filter.average();
        let rpm = self.rpm_filter.average();
        let direction = self.resolver.resolve(votes);
        self.readout.store().publish(speed, rpm, direction);

        Measurement {
            edges,
            window_s,
            raw_rpm,
            raw_speed,
            speed_held,
            rpm,
            speed,
            distance_m,
            direction,
        }
    }

    fn stop(&mut self, snap: &Snapshot) {
        if !self.stopped {
            info!(
                edges = snap.edge_count,
                rejected = snap.rejected_count,
                "no edges within stop timeout, shaft stopped"
            );
        }
        self.stopped = true;
        self.speed_filter.reset();
        self.rpm_filter.reset();
        self.last_speed = 0.0;
        self.resolver.force_stopped();
        self.readout.store().publish(0.0, 0.0, Direction::Stopped);
        self.baseline = Baseline {
            edges: snap.edge_count,
            at: snap.now,
        };
    }

    /// Filtered linear speed in the configured unit.
    pub fn speed(&self) -> f32 {
        self.readout.speed()
    }

    /// Filtered shaft speed in revolutions per minute.
    pub fn rpm(&self) -> f32 {
        self.readout.rpm()
    }

    /// Travelled distance in metres.
    pub fn distance(&self) -> f64 {
        self.readout.distance()
    }

    pub fn direction(&self) -> Direction {
        self.readout.direction()
    }

    pub fn reset_distance(&self) {
        self.readout.reset_distance();
    }

    pub fn frame(&self) -> DisplayFrame {
        self.readout.frame()
    }

    /// Cloneable reader for other threads.
    pub fn handle(&self) -> ReadoutHandle {
        self.readout.clone()
    }

    pub fn edge_count(&self) -> u32 {
        self.shared.edge_count()
    }

    pub fn interrupt_count(&self) -> u32 {
        self.shared.interrupt_count()
    }

    pub fn rejected_count(&self) -> u32 {
        self.shared.rejected_count()
    }

    /// Configured estimation cadence.
    pub fn update_hz(&self) -> u32 {
        self.params.update_hz
    }

    pub fn speed_unit(&self) -> SpeedUnit {
        self.params.unit
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn timebase(&self) -> &TimeBase<T> {
        &self.timebase
    }
}
