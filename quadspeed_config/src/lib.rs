#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and edge-trace parsing for the tachometer.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The edge-trace CSV loader enforces headers and channel levels so a
//!   recorded run can be replayed deterministically.
use serde::Deserialize;

/// Edge-trace CSV schema.
///
/// Expected headers:
/// ticks,a,b
///
/// `ticks` is the raw down-counter value sampled at the edge, `a`/`b` the
/// channel levels (0 or 1) read right after it.
///
/// Example:
/// ticks,a,b
/// 4294967295,1,1
/// 4294962295,0,1
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub ticks: u32,
    pub a: u8,
    pub b: u8,
}

impl TraceRow {
    #[inline]
    pub fn levels(&self) -> (bool, bool) {
        (self.a != 0, self.b != 0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// BCM pin number of channel A
    pub channel_a: u8,
    /// BCM pin number of channel B
    pub channel_b: u8,
    /// Enable the internal pull-ups on both inputs
    pub pull_up: bool,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            channel_a: 17,
            channel_b: 27,
            pull_up: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SensorCfg {
    /// Accepted quadrature transitions per full shaft rotation
    pub edges_per_rotation: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct WheelCfg {
    pub circumference_m: Option<f64>,
    pub radius_m: Option<f64>,
}

impl WheelCfg {
    /// Effective circumference in metres, whichever way it was given.
    pub fn circumference_m(&self) -> Option<f64> {
        match (self.circumference_m, self.radius_m) {
            (Some(c), None) => Some(c),
            (None, Some(r)) => Some(2.0 * std::f64::consts::PI * r),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimebaseCfg {
    /// Counting frequency of the down-counter
    pub frequency_hz: u32,
    /// Counter width in bits
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureCfg {
    /// Edges closer together than this are treated as contact noise
    pub noise_floor_us: u64,
    /// Edges further apart than this are treated as stale
    pub stale_ceiling_ms: u64,
    /// Absolute bound of the direction vote accumulator
    pub vote_band: i32,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            noise_floor_us: 50,
            stale_ceiling_ms: 2_000,
            vote_band: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Kmh,
    Mps,
    Mph,
}

impl SpeedUnit {
    /// Multiplier from metres per second into this unit.
    pub fn per_mps(self) -> f64 {
        match self {
            SpeedUnit::Kmh => 3.6,
            SpeedUnit::Mps => 1.0,
            SpeedUnit::Mph => 3600.0 / 1609.344,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedUnit::Kmh => "km/h",
            SpeedUnit::Mps => "m/s",
            SpeedUnit::Mph => "mph",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EstimatorCfg {
    /// Estimation cadence
    pub update_hz: u32,
    /// Windows shorter than this are deferred
    pub min_window_ms: u64,
    /// No edges for this long means the shaft stopped
    pub stopped_timeout_ms: u64,
    /// Raw RPM saturates here
    pub max_rpm: f32,
    /// Raw speeds above this (display unit) are discarded
    pub max_speed: f32,
    pub speed_unit: SpeedUnit,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            update_hz: 100,
            min_window_ms: 5,
            stopped_timeout_ms: 1_000,
            max_rpm: 10_000.0,
            max_speed: 120.0,
            speed_unit: SpeedUnit::Kmh,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DirectionCfg {
    /// Net votes needed before the published direction flips
    pub threshold: i32,
}

impl Default for DirectionCfg {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Synthetic encoder driven at `runner.sim_rpm`
    #[default]
    Sim,
    /// GPIO inputs (requires the `hardware` feature)
    Hardware,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    pub mode: RunMode,
    /// Shaft speed of the simulated encoder
    pub sim_rpm: f32,
    /// Capture thread wait granularity; bounds shutdown latency
    pub edge_timeout_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            mode: RunMode::Sim,
            sim_rpm: 300.0,
            edge_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    pub sensor: SensorCfg,
    pub wheel: WheelCfg,
    #[serde(default)]
    pub timebase: TimebaseCfg,
    #[serde(default)]
    pub capture: CaptureCfg,
    #[serde(default)]
    pub estimator: EstimatorCfg,
    #[serde(default)]
    pub direction: DirectionCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["ticks", "a", "b"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 'ticks,a,b', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if row.a > 1 || row.b > 1 {
            eyre::bail!(
                "invalid CSV row {}: channel levels must be 0 or 1, got a={} b={}",
                idx + 2,
                row.a,
                row.b
            );
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("trace CSV {:?} contains no edges", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.channel_a == self.pins.channel_b {
            eyre::bail!("pins.channel_a and pins.channel_b must differ");
        }

        // Sensor
        if self.sensor.edges_per_rotation == 0 {
            eyre::bail!("sensor.edges_per_rotation must be > 0");
        }

        // Wheel
        match (self.wheel.circumference_m, self.wheel.radius_m) {
            (Some(_), Some(_)) => {
                eyre::bail!("wheel: set exactly one of circumference_m or radius_m, not both")
            }
            (None, None) => eyre::bail!("wheel: one of circumference_m or radius_m is required"),
            (Some(c), None) if !(c.is_finite() && c > 0.0) => {
                eyre::bail!("wheel.circumference_m must be > 0")
            }
            (None, Some(r)) if !(r.is_finite() && r > 0.0) => {
                eyre::bail!("wheel.radius_m must be > 0")
            }
            _ => {}
        }

        // Timebase
        if self.timebase.frequency_hz == 0 {
            eyre::bail!("timebase.frequency_hz must be > 0");
        }
        if !(1..=32).contains(&self.timebase.width_bits) {
            eyre::bail!("timebase.width_bits must be in [1, 32]");
        }

        // Capture
        if self.capture.stale_ceiling_ms.saturating_mul(1000) <= self.capture.noise_floor_us {
            eyre::bail!("capture.stale_ceiling_ms must exceed capture.noise_floor_us");
        }
        if self.capture.vote_band <= 0 {
            eyre::bail!("capture.vote_band must be > 0");
        }

        // Estimator
        if self.estimator.update_hz == 0 {
            eyre::bail!("estimator.update_hz must be > 0");
        }
        if self.estimator.update_hz > 10_000 {
            eyre::bail!("estimator.update_hz is unreasonably large (>10kHz)");
        }
        if self.estimator.stopped_timeout_ms < self.estimator.min_window_ms {
            eyre::bail!("estimator.stopped_timeout_ms must be >= estimator.min_window_ms");
        }
        if self.estimator.stopped_timeout_ms > 60 * 60 * 1000 {
            eyre::bail!("estimator.stopped_timeout_ms is unreasonably large (>1h)");
        }
        if !(self.estimator.max_rpm.is_finite() && self.estimator.max_rpm > 0.0) {
            eyre::bail!("estimator.max_rpm must be > 0");
        }
        if !(self.estimator.max_speed.is_finite() && self.estimator.max_speed > 0.0) {
            eyre::bail!("estimator.max_speed must be > 0");
        }

        // Direction
        if self.direction.threshold < 0 {
            eyre::bail!("direction.threshold must be >= 0");
        }
        if self.direction.threshold >= self.capture.vote_band {
            eyre::bail!("direction.threshold must be < capture.vote_band");
        }

        // Runner
        if !(self.runner.sim_rpm.is_finite() && self.runner.sim_rpm >= 0.0) {
            eyre::bail!("runner.sim_rpm must be >= 0");
        }
        if self.runner.edge_timeout_ms == 0 {
            eyre::bail!("runner.edge_timeout_ms must be >= 1");
        }

        Ok(())
    }
}
