use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeedoError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("capture thread stopped: {0}")]
    CaptureStopped(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing sensor geometry")]
    MissingSensor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
