use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, Trigger};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Two GPIO inputs with both-edge interrupts.
///
/// A single `poll_interrupts` call waits on both channels so exactly one
/// thread observes edges.
pub struct GpioQuadrature {
    gpio: Gpio,
    a: InputPin,
    b: InputPin,
}

impl GpioQuadrature {
    pub fn new(channel_a: u8, channel_b: u8, pull_up: bool) -> Result<Self> {
        if channel_a == channel_b {
            return Err(HwError::InvalidConfig("channel pins must differ"));
        }
        let gpio = Gpio::new().map_err(gpio_err)?;
        let open = |pin: u8| -> Result<InputPin> {
            let p = gpio.get(pin).map_err(gpio_err)?;
            Ok(if pull_up {
                p.into_input_pullup()
            } else {
                p.into_input()
            })
        };
        let mut a = open(channel_a)?;
        let mut b = open(channel_b)?;
        a.set_interrupt(Trigger::Both).map_err(gpio_err)?;
        b.set_interrupt(Trigger::Both).map_err(gpio_err)?;
        debug!(channel_a, channel_b, pull_up, "quadrature inputs armed");
        Ok(Self { gpio, a, b })
    }
}

impl quadspeed_traits::QuadratureSensor for GpioQuadrature {
    fn wait_for_edge(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let hit = self
            .gpio
            .poll_interrupts(&[&self.a, &self.b], false, Some(timeout))
            .map_err(gpio_err)?;
        if let Some((pin, level)) = hit {
            trace!(pin = pin.pin(), ?level, "edge");
        }
        Ok(hit.is_some())
    }

    fn read_channels(
        &mut self,
    ) -> std::result::Result<(bool, bool), Box<dyn std::error::Error + Send + Sync>> {
        Ok((self.a.is_high(), self.b.is_high()))
    }
}
