#![allow(dead_code)]

use std::time::Duration;

use quadspeed_core::{
    EdgeCapture, EdgeOutcome, EstimatorCfg, MeterCfg, SensorCfg, Speedometer, UpdateOutcome,
};
use quadspeed_traits::ManualTicks;

/// Forward rotation visits these levels in order, starting after idle 11.
pub const FORWARD: [(bool, bool); 4] = [(false, true), (false, false), (true, false), (true, true)];

pub fn sensor() -> SensorCfg {
    SensorCfg {
        edges_per_rotation: 4,
        circumference_m: 0.2,
    }
}

/// A meter driven by hand: the test moves the counter and injects edges.
pub struct Rig {
    pub ticks: ManualTicks,
    pub capture: EdgeCapture<ManualTicks>,
    pub meter: Speedometer<ManualTicks>,
    /// Index into `FORWARD` of the current channel state; idle 11 is 3.
    phase: usize,
}

impl Rig {
    pub fn new(cfg: &MeterCfg) -> Self {
        Self::starting_at(u32::MAX, cfg)
    }

    pub fn starting_at(start: u32, cfg: &MeterCfg) -> Self {
        let ticks = ManualTicks::new(start, cfg.timebase.frequency_hz, cfg.timebase.width_bits);
        let (capture, meter) = quadspeed_core::init(ticks.clone(), cfg).expect("valid config");
        Self {
            ticks,
            capture,
            meter,
            phase: 3,
        }
    }

    /// Default limits, speed in m/s.
    pub fn mps() -> Self {
        Self::new(&mps_cfg())
    }

    pub fn wait(&self, d: Duration) {
        self.ticks.advance(d);
    }

    pub fn forward(&mut self) -> EdgeOutcome {
        self.phase = (self.phase + 1) % 4;
        let levels = FORWARD[self.phase];
        self.capture.on_edge(|| levels)
    }

    pub fn reverse(&mut self) -> EdgeOutcome {
        self.phase = (self.phase + 3) % 4;
        let levels = FORWARD[self.phase];
        self.capture.on_edge(|| levels)
    }

    /// `n` forward edges `spacing` apart, updating after every `per_update`.
    pub fn spin(&mut self, n: usize, spacing: Duration, per_update: usize) -> Vec<UpdateOutcome> {
        let mut out = Vec::new();
        for i in 1..=n {
            self.wait(spacing);
            self.forward();
            if i % per_update == 0 {
                out.push(self.meter.update());
            }
        }
        out
    }
}

pub fn mps_cfg() -> MeterCfg {
    let mut cfg = MeterCfg::new(sensor());
    cfg.estimator = EstimatorCfg {
        speed_unit: quadspeed_config::SpeedUnit::Mps,
        ..EstimatorCfg::default()
    };
    cfg
}

pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
