//! Sensor back-ends for the tachometer.
//!
//! `SimulatedEncoder` is always available; `GpioQuadrature` needs the
//! `hardware` feature and a Linux target.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod simulated;

pub use error::HwError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioQuadrature;
pub use simulated::SimulatedEncoder;
