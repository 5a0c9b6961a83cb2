//! Live measurement: sensor assembly, capture thread and the periodic loop.

use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use eyre::{Report, WrapErr};
use quadspeed_config::{Config, RunMode};
use quadspeed_core::hw_error::map_hw_error;
use quadspeed_core::runner::{self, RunOptions};
use quadspeed_core::{CaptureThread, EdgeCapture, MeterCfg};
use quadspeed_hardware::SimulatedEncoder;
use quadspeed_traits::{Direction, MonotonicClock, MonotonicTicks};

use crate::cli::{RtLock, SIM_RPM_ENV};
use crate::output::{ConsoleDisplay, print_stats, print_summary};
use crate::rt::{lower_estimator_priority, setup_rt_once};

pub type HostTicks = MonotonicTicks<MonotonicClock>;

/// Options of the `run` subcommand.
#[derive(Debug, Clone, Copy)]
pub struct RunArgs {
    pub duration_ms: Option<u64>,
    pub sim_rpm: Option<f32>,
    pub reverse: bool,
    pub every: usize,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: RtLock,
    pub stats: bool,
}

pub fn host_ticks(meter: &MeterCfg) -> HostTicks {
    MonotonicTicks::new(
        MonotonicClock::new(),
        meter.timebase.frequency_hz,
        meter.timebase.width_bits,
    )
}

/// `--sim-rpm`, then the environment, then `runner.sim_rpm`.
pub fn resolve_sim_rpm(flag: Option<f32>, configured: f32) -> eyre::Result<f32> {
    if let Some(rpm) = flag {
        return Ok(rpm);
    }
    match std::env::var(SIM_RPM_ENV) {
        Ok(v) => v
            .trim()
            .parse::<f32>()
            .wrap_err_with(|| format!("{SIM_RPM_ENV} must be a number, got {v:?}")),
        Err(_) => Ok(configured),
    }
}

pub fn simulated_sensor(
    edges_per_rotation: u32,
    rpm: f32,
    direction: Direction,
) -> eyre::Result<SimulatedEncoder> {
    SimulatedEncoder::new(edges_per_rotation, rpm, direction).map_err(|e| Report::new(map_hw_error(&e)))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn gpio_sensor(cfg: &Config) -> eyre::Result<quadspeed_hardware::GpioQuadrature> {
    quadspeed_hardware::GpioQuadrature::new(cfg.pins.channel_a, cfg.pins.channel_b, cfg.pins.pull_up)
        .map_err(|e| Report::new(map_hw_error(&e)))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn spawn_hardware(
    cfg: &Config,
    capture: EdgeCapture<HostTicks>,
    edge_timeout: Duration,
) -> eyre::Result<CaptureThread> {
    let sensor = gpio_sensor(cfg)?;
    tracing::info!(
        channel_a = cfg.pins.channel_a,
        channel_b = cfg.pins.channel_b,
        pull_up = cfg.pins.pull_up,
        "GPIO sensor opened"
    );
    Ok(CaptureThread::spawn(sensor, capture, edge_timeout))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn spawn_hardware(
    _cfg: &Config,
    _capture: EdgeCapture<HostTicks>,
    _edge_timeout: Duration,
) -> eyre::Result<CaptureThread> {
    eyre::bail!("runner.mode = \"hardware\" needs a Linux build with --features hardware")
}

pub fn run(cfg: &Config, args: &RunArgs, json: bool, shutdown: &AtomicBool) -> eyre::Result<()> {
    let meter_cfg: MeterCfg = cfg.into();
    let (capture, mut meter) = quadspeed_core::init(host_ticks(&meter_cfg), &meter_cfg)?;

    // before the capture thread exists, so it inherits the policy
    let rt_priority = if args.rt {
        setup_rt_once(args.rt_prio, args.rt_lock)
    } else {
        None
    };

    let edge_timeout = Duration::from_millis(cfg.runner.edge_timeout_ms);
    let thread = match cfg.runner.mode {
        RunMode::Sim => {
            let rpm = resolve_sim_rpm(args.sim_rpm, cfg.runner.sim_rpm)?;
            let direction = if args.reverse {
                Direction::Reverse
            } else {
                Direction::Forward
            };
            let sensor = simulated_sensor(meter_cfg.sensor.edges_per_rotation, rpm, direction)?;
            tracing::info!(rpm, %direction, "simulated sensor");
            CaptureThread::spawn(sensor, capture, edge_timeout)
        }
        RunMode::Hardware => spawn_hardware(cfg, capture, edge_timeout)?,
    };
    // this thread runs the estimator from here on
    if let Some(capture_priority) = rt_priority {
        lower_estimator_priority(capture_priority);
    }

    let mut display = ConsoleDisplay::new(json, args.every);
    let started = Instant::now();
    let summary = runner::run(
        &thread,
        &mut meter,
        &mut display,
        &MonotonicClock::new(),
        RunOptions {
            max_duration: args.duration_ms.map(Duration::from_millis),
        },
        shutdown,
    )?;
    drop(thread);

    if args.stats {
        print_stats(&summary, meter.update_hz());
    }
    print_summary("run", &summary, started.elapsed(), json);
    Ok(())
}
