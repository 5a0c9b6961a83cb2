//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Overrides `runner.sim_rpm` when `--sim-rpm` is not given.
pub const SIM_RPM_ENV: &str = "QUADSPEED_SIM_RPM";

#[derive(Parser, Debug)]
#[command(name = "quadspeed", version, about = "Quadrature tachometer")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/quadspeed.toml")]
    pub config: PathBuf,

    /// Print frames and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure live from the simulated or GPIO sensor
    Run {
        /// Stop after this many milliseconds (default: until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Shaft speed of the simulated sensor (takes precedence over config and env)
        #[arg(long, value_name = "RPM")]
        sim_rpm: Option<f32>,
        /// Spin the simulated sensor backwards
        #[arg(long, action = ArgAction::SetTrue)]
        reverse: bool,
        /// Print every Nth frame
        #[arg(long, value_name = "N", default_value_t = 10)]
        every: usize,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux before the capture thread starts.\n\nApplies SCHED_FIFO at the requested priority to the capture thread, runs the estimator one level below it, and locks the address space with mlockall so edge capture is not delayed by paging. Usually needs CAP_SYS_NICE and CAP_IPC_LOCK (or root); failures are reported as warnings and the run continues."
        )]
        rt: bool,
        /// SCHED_FIFO priority of the capture thread (2..=max); the estimator runs one below
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
        /// Print cycle statistics on completion
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Replay a recorded edge trace (CSV with headers ticks,a,b)
    Replay {
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Print every Nth frame
        #[arg(long, value_name = "N", default_value_t = 1)]
        every: usize,
    },
    /// Validate the configuration and open the sensor
    SelfCheck,
}
