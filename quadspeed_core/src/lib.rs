#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Tachometer measurement core (hardware-agnostic).
//!
//! Turns edges from a two-channel quadrature sensor into filtered RPM, linear
//! speed, travelled distance and direction. All hardware interaction goes
//! through `quadspeed_traits::TickSource` and `quadspeed_traits::QuadratureSensor`.
//!
//! ## Architecture
//!
//! - **Capture** (`capture`): the single writer; runs per edge, never blocks
//! - **Shared state** (`shared`): sequence-locked counters between the two sides
//! - **Estimation** (`estimator`): periodic windowed rate, clamps and stop detection
//! - **Smoothing / direction** (`filter`, `direction`): moving averages and vote hysteresis
//! - **Readout** (`readout`): lock-free published values for any number of readers
//!
//! ```no_run
//! use quadspeed_core::{SensorCfg, Speedometer};
//! use quadspeed_traits::ManualTicks;
//!
//! let ticks = ManualTicks::new(u32::MAX, 1_000_000, 32);
//! let (mut capture, mut meter) = Speedometer::builder()
//!     .ticks(ticks.clone())
//!     .sensor(SensorCfg { edges_per_rotation: 4, circumference_m: 0.2 })
//!     .build()?;
//! capture.on_edge(|| (false, true));
//! let _ = meter.update();
//! println!("{} rpm", meter.rpm());
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod builder;
pub mod capture;
pub mod capture_thread;
pub mod config;
pub mod conversions;
pub mod direction;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod hw_error;
pub mod mocks;
pub mod quadrature;
pub mod readout;
pub mod replay;
pub mod runner;
pub mod shared;
pub mod status;
pub mod timebase;
pub mod util;

pub use builder::{Missing, Set, SpeedometerBuilder};
pub use capture::{EdgeCapture, EdgeOutcome};
pub use capture_thread::CaptureThread;
pub use config::{CaptureCfg, DirectionCfg, EstimatorCfg, MeterCfg, SensorCfg, TimebaseCfg};
pub use error::{BuildError, SpeedoError};
pub use estimator::Speedometer;
pub use quadspeed_traits::Direction;
pub use readout::ReadoutHandle;
pub use runner::{RunOptions, RunSummary};
pub use status::{DeferReason, Measurement, UpdateOutcome};

use quadspeed_traits::TickSource;

/// Build the capture handle and meter for `ticks` from a full configuration.
pub fn init<T: TickSource + Clone>(
    ticks: T,
    cfg: &MeterCfg,
) -> error::Result<(EdgeCapture<T>, Speedometer<T>)> {
    Speedometer::builder().ticks(ticks).config(cfg).build()
}
