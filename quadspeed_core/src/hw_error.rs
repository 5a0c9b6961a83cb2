//! Maps `Box<dyn Error>` from trait boundaries to typed `SpeedoError`.
//!
//! The traits in `quadspeed_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `quadspeed_hardware::HwError` downcasting.

use crate::error::SpeedoError;

/// Map a sensor-boundary error to a typed `SpeedoError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SpeedoError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<quadspeed_hardware::HwError>() {
            return match hw {
                quadspeed_hardware::HwError::InvalidConfig(msg) => {
                    SpeedoError::Config((*msg).to_string())
                }
                other => SpeedoError::HardwareFault(other.to_string()),
            };
        }
    }

    SpeedoError::Hardware(e.to_string())
}

/// Map a display-boundary error to a typed `SpeedoError`.
pub fn map_display_error(e: &(dyn std::error::Error + 'static)) -> SpeedoError {
    SpeedoError::Display(e.to_string())
}
