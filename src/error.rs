//! Error types for RoverNav

use thiserror::Error;

/// RoverNav error type
///
/// None of these are fatal to the process: callers log them and carry on.
#[derive(Error, Debug)]
pub enum NavError {
    /// Unparsable, missing or non-finite numeric telemetry field
    #[error("Malformed telemetry: {0}")]
    MalformedTelemetry(String),

    /// Mission started with no destinations
    #[error("Mission has no destinations")]
    EmptyMission,

    /// Mission started while another one is still running
    #[error("A mission is already active")]
    MissionAlreadyActive,

    /// Outbound drive command could not be handed to the channel
    #[error("Command delivery failed: {0}")]
    CommandDelivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mission worker could not be spawned or panicked
    #[error("Thread error: {0}")]
    Thread(String),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for NavError {
    fn from(e: toml::ser::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
