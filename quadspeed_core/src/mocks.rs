//! Test and helper mocks for quadspeed_core

use std::time::Duration;

use quadspeed_traits::{Display, DisplayFrame, QuadratureSensor};

/// A sensor that never reports an edge; each wait sleeps for its timeout.
pub struct IdleSensor;

impl QuadratureSensor for IdleSensor {
    fn wait_for_edge(
        &mut self,
        timeout: Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(timeout);
        Ok(false)
    }

    fn read_channels(&mut self) -> Result<(bool, bool), Box<dyn std::error::Error + Send + Sync>> {
        Ok((true, true))
    }
}

/// A sensor whose every call fails, for exercising fault paths.
pub struct FailingSensor;

impl QuadratureSensor for FailingSensor {
    fn wait_for_edge(
        &mut self,
        _timeout: Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("sensor unplugged")))
    }

    fn read_channels(&mut self) -> Result<(bool, bool), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("sensor unplugged")))
    }
}

/// Display that keeps every frame it is shown.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub frames: Vec<DisplayFrame>,
}

impl Display for RecordingDisplay {
    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.frames.push(*frame);
        Ok(())
    }
}
