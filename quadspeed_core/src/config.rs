//! Configuration types for the measurement core.
//!
//! These are the runtime configuration structs used by the builder.
//! They are separate from the TOML-deserialized config in `quadspeed_config`.
use std::time::Duration;

use quadspeed_config::SpeedUnit;

/// Shaft/wheel geometry. Has no sensible default, so the builder requires it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCfg {
    /// Accepted transitions per full rotation.
    pub edges_per_rotation: u32,
    /// Distance covered per rotation, metres.
    pub circumference_m: f64,
}

/// Edge-qualification limits applied by `EdgeCapture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCfg {
    /// Shorter periods are treated as contact noise.
    pub noise_floor: Duration,
    /// Longer periods are treated as stale; the edge timer is re-armed.
    pub stale_ceiling: Duration,
    /// Absolute clamp for the direction vote accumulator.
    pub vote_band: i32,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            noise_floor: Duration::from_micros(50),
            stale_ceiling: Duration::from_secs(2),
            vote_band: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorCfg {
    /// Estimation cadence in Hz (used by the runner and replay).
    pub update_hz: u32,
    pub min_window: Duration,
    pub stopped_timeout: Duration,
    /// Raw RPM saturates at this value.
    pub max_rpm: f32,
    /// Raw speeds above this (display unit) are replaced by the last good one.
    pub max_speed: f32,
    pub speed_unit: SpeedUnit,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            update_hz: 100,
            min_window: Duration::from_millis(5),
            stopped_timeout: Duration::from_secs(1),
            max_rpm: 10_000.0,
            max_speed: 120.0,
            speed_unit: SpeedUnit::Kmh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionCfg {
    pub threshold: i32,
}

impl Default for DirectionCfg {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

/// Counter parameters for tick sources built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimebaseCfg {
    pub frequency_hz: u32,
    pub width_bits: u8,
}

impl Default for TimebaseCfg {
    fn default() -> Self {
        Self {
            frequency_hz: 1_000_000,
            width_bits: 32,
        }
    }
}

/// Everything needed to build a meter, bundled for the CLI and replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterCfg {
    pub timebase: TimebaseCfg,
    pub sensor: SensorCfg,
    pub capture: CaptureCfg,
    pub estimator: EstimatorCfg,
    pub direction: DirectionCfg,
}

impl MeterCfg {
    pub fn new(sensor: SensorCfg) -> Self {
        Self {
            timebase: TimebaseCfg::default(),
            sensor,
            capture: CaptureCfg::default(),
            estimator: EstimatorCfg::default(),
            direction: DirectionCfg::default(),
        }
    }
}
