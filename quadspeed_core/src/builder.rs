//! Type-state builder producing a capture handle and its meter.
//!
//! The builder enforces at compile time that a tick source and the sensor
//! geometry are provided before `build()` is available. `try_build()` only
//! needs the tick source and reports missing geometry at runtime.

use std::marker::PhantomData;
use std::sync::Arc;

use quadspeed_traits::TickSource;

use crate::capture::EdgeCapture;
use crate::config::{CaptureCfg, DirectionCfg, EstimatorCfg, MeterCfg, SensorCfg};
use crate::error::{BuildError, Result};
use crate::estimator::{EstimatorParams, Speedometer};
use crate::quadrature::QuadratureState;
use crate::shared::SharedMeasurement;
use crate::timebase::TimeBase;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for an `(EdgeCapture, Speedometer)` pair sharing one state.
pub struct SpeedometerBuilder<T, S> {
    ticks: T,
    sensor: Option<SensorCfg>,
    capture: CaptureCfg,
    estimator: EstimatorCfg,
    direction: DirectionCfg,
    initial_levels: (bool, bool),
    _s: PhantomData<S>,
}

impl Default for SpeedometerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            ticks: Missing,
            sensor: None,
            capture: CaptureCfg::default(),
            estimator: EstimatorCfg::default(),
            direction: DirectionCfg::default(),
            // idle level of pulled-up open-collector outputs
            initial_levels: (true, true),
            _s: PhantomData,
        }
    }
}

impl Speedometer<Missing> {
    /// Start building a meter.
    pub fn builder() -> SpeedometerBuilder<Missing, Missing> {
        SpeedometerBuilder::default()
    }
}

impl<T, S> SpeedometerBuilder<T, S> {
    /// Counter both halves sample. It is cloned once, so clones must observe
    /// the same underlying counter.
    pub fn ticks<U: TickSource + Clone>(self, ticks: U) -> SpeedometerBuilder<U, S> {
        SpeedometerBuilder {
            ticks,
            sensor: self.sensor,
            capture: self.capture,
            estimator: self.estimator,
            direction: self.direction,
            initial_levels: self.initial_levels,
            _s: PhantomData,
        }
    }

    pub fn sensor(self, sensor: SensorCfg) -> SpeedometerBuilder<T, Set> {
        SpeedometerBuilder {
            ticks: self.ticks,
            sensor: Some(sensor),
            capture: self.capture,
            estimator: self.estimator,
            direction: self.direction,
            initial_levels: self.initial_levels,
            _s: PhantomData,
        }
    }

    /// Apply a whole `MeterCfg`. Its timebase section describes the tick
    /// source and is not used here.
    pub fn config(self, cfg: &MeterCfg) -> SpeedometerBuilder<T, Set> {
        self.capture(cfg.capture)
            .estimator(cfg.estimator)
            .direction(cfg.direction)
            .sensor(cfg.sensor)
    }

    pub fn capture(mut self, cfg: CaptureCfg) -> Self {
        self.capture = cfg;
        self
    }

    pub fn estimator(mut self, cfg: EstimatorCfg) -> Self {
        self.estimator = cfg;
        self
    }

    pub fn direction(mut self, cfg: DirectionCfg) -> Self {
        self.direction = cfg;
        self
    }

    /// Channel levels assumed before the first edge (default: both high).
    pub fn initial_levels(mut self, a: bool, b: bool) -> Self {
        self.initial_levels = (a, b);
        self
    }
}

impl<T: TickSource + Clone, S> SpeedometerBuilder<T, S> {
    /// Validate and construct.
    pub fn try_build(self) -> Result<(EdgeCapture<T>, Speedometer<T>)> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        validate(&sensor, &self.capture, &self.estimator, &self.direction)?;

        let timebase = TimeBase::new(self.ticks);
        let wrap = timebase.wrap_period();
        if self.capture.stale_ceiling >= wrap {
            return Err(invalid("stale_ceiling must be shorter than the counter wrap period"));
        }
        if self.estimator.stopped_timeout >= wrap {
            return Err(invalid(
                "stopped_timeout must be shorter than the counter wrap period",
            ));
        }

        let params = EstimatorParams {
            edges_per_rotation: f64::from(sensor.edges_per_rotation),
            circumference_m: sensor.circumference_m,
            min_window: timebase.duration_to_ticks(self.estimator.min_window).max(1),
            stopped_timeout: timebase.duration_to_ticks(self.estimator.stopped_timeout),
            max_rpm: self.estimator.max_rpm,
            max_speed: self.estimator.max_speed,
            unit: self.estimator.speed_unit,
            update_hz: self.estimator.update_hz,
        };
        let noise_floor = timebase.duration_to_ticks(self.capture.noise_floor);
        let stale_ceiling = timebase.duration_to_ticks(self.capture.stale_ceiling);

        let (a, b) = self.initial_levels;
        let initial = QuadratureState::from_levels(a, b);
        let now = timebase.now();
        let shared = Arc::new(SharedMeasurement::new(initial, now));

        let capture = EdgeCapture::new(
            timebase.clone(),
            shared.clone(),
            noise_floor,
            stale_ceiling,
            self.capture.vote_band,
            initial,
            now,
        );
        let meter = Speedometer::new(timebase, shared, params, self.direction.threshold);
        tracing::debug!(
            edges_per_rotation = sensor.edges_per_rotation,
            circumference_m = sensor.circumference_m,
            noise_floor_ticks = noise_floor,
            stale_ceiling_ticks = stale_ceiling,
            min_window_ticks = params.min_window,
            stopped_timeout_ticks = params.stopped_timeout,
            "meter built"
        );
        Ok((capture, meter))
    }
}

impl<T: TickSource + Clone> SpeedometerBuilder<T, Set> {
    /// Construct once tick source and sensor geometry are both set.
    pub fn build(self) -> Result<(EdgeCapture<T>, Speedometer<T>)> {
        self.try_build()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(
    sensor: &SensorCfg,
    capture: &CaptureCfg,
    estimator: &EstimatorCfg,
    direction: &DirectionCfg,
) -> Result<()> {
    if sensor.edges_per_rotation == 0 {
        return Err(invalid("edges_per_rotation must be > 0"));
    }
    if !(sensor.circumference_m.is_finite() && sensor.circumference_m > 0.0) {
        return Err(invalid("circumference_m must be > 0"));
    }
    if capture.vote_band <= 0 {
        return Err(invalid("vote_band must be > 0"));
    }
    if capture.noise_floor >= capture.stale_ceiling {
        return Err(invalid("noise_floor must be below stale_ceiling"));
    }
    if direction.threshold < 0 || direction.threshold >= capture.vote_band {
        return Err(invalid("direction threshold must be in [0, vote_band)"));
    }
    if estimator.update_hz == 0 {
        return Err(invalid("update_hz must be > 0"));
    }
    if estimator.stopped_timeout < estimator.min_window {
        return Err(invalid("stopped_timeout must be >= min_window"));
    }
    if !(estimator.max_rpm.is_finite() && estimator.max_rpm > 0.0) {
        return Err(invalid("max_rpm must be > 0"));
    }
    if !(estimator.max_speed.is_finite() && estimator.max_speed > 0.0) {
        return Err(invalid("max_speed must be > 0"));
    }
    Ok(())
}
