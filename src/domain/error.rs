//! Domain error types

use thiserror::Error;

/// Errors that can occur in the FM receiver
#[derive(Error, Debug)]
pub enum FmError {
    /// Device open/read/tune failure. Fatal to the current session.
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Playback stream open/write failure. Fatal to playback only.
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Numeric fault inside the demodulator. Callers substitute silence.
    #[error("Demodulation fault: {0}")]
    Demodulation(String),

    /// The audio queue rejected a block because it is at capacity.
    #[error("Audio queue full")]
    QueueFull,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Duplicate station: {0}")]
    DuplicateStation(String),

    #[error("Scanner error: {0}")]
    Scan(String),
}

/// Result type alias for receiver operations
pub type FmResult<T> = Result<T, FmError>;
