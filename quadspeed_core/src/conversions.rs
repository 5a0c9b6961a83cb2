//! `From` implementations bridging `quadspeed_config` types to core types.

use std::time::Duration;

use crate::config::{CaptureCfg, DirectionCfg, EstimatorCfg, MeterCfg, SensorCfg, TimebaseCfg};

// ── SensorCfg ────────────────────────────────────────────────────────────────

/// Combines `[sensor]` and `[wheel]`. A wheel without a usable size maps to a
/// zero circumference, which the builder rejects.
impl From<&quadspeed_config::Config> for SensorCfg {
    fn from(c: &quadspeed_config::Config) -> Self {
        Self {
            edges_per_rotation: c.sensor.edges_per_rotation,
            circumference_m: c.wheel.circumference_m().unwrap_or(0.0),
        }
    }
}

// ── CaptureCfg ───────────────────────────────────────────────────────────────

impl From<&quadspeed_config::CaptureCfg> for CaptureCfg {
    fn from(c: &quadspeed_config::CaptureCfg) -> Self {
        Self {
            noise_floor: Duration::from_micros(c.noise_floor_us),
            stale_ceiling: Duration::from_millis(c.stale_ceiling_ms),
            vote_band: c.vote_band,
        }
    }
}

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&quadspeed_config::EstimatorCfg> for EstimatorCfg {
    fn from(c: &quadspeed_config::EstimatorCfg) -> Self {
        Self {
            update_hz: c.update_hz,
            min_window: Duration::from_millis(c.min_window_ms),
            stopped_timeout: Duration::from_millis(c.stopped_timeout_ms),
            max_rpm: c.max_rpm,
            max_speed: c.max_speed,
            speed_unit: c.speed_unit,
        }
    }
}

// ── DirectionCfg ─────────────────────────────────────────────────────────────

impl From<&quadspeed_config::DirectionCfg> for DirectionCfg {
    fn from(c: &quadspeed_config::DirectionCfg) -> Self {
        Self {
            threshold: c.threshold,
        }
    }
}

// ── TimebaseCfg ──────────────────────────────────────────────────────────────

impl From<&quadspeed_config::TimebaseCfg> for TimebaseCfg {
    fn from(c: &quadspeed_config::TimebaseCfg) -> Self {
        Self {
            frequency_hz: c.frequency_hz,
            width_bits: c.width_bits,
        }
    }
}

// ── MeterCfg ─────────────────────────────────────────────────────────────────

impl From<&quadspeed_config::Config> for MeterCfg {
    fn from(c: &quadspeed_config::Config) -> Self {
        Self {
            timebase: (&c.timebase).into(),
            sensor: c.into(),
            capture: (&c.capture).into(),
            estimator: (&c.estimator).into(),
            direction: (&c.direction).into(),
        }
    }
}
