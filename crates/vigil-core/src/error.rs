//! Error types for the monitor pipeline.
//!
//! Faults are split along the boundary that matters at runtime: whether the
//! monitor loop can keep going.
//!
//! | Variant | Fatal | Typical cause |
//! |---------|-------|---------------|
//! | [`Error::Setup`] | yes | GPIO or I2C could not be brought up |
//! | [`Error::Config`] | yes | configuration rejected at startup |
//! | [`Error::Sensor`] | no | one sensor read failed this cycle |
//! | [`Error::Actuator`] | no | one output write failed this cycle |
//! | [`Error::Capture`] | no | still image capture failed |
//! | [`Error::Notify`] | no | image upload or message delivery failed |
//! | [`Error::Io`] | no | filesystem access around captures |
//!
//! Non-fatal faults are logged, counted, and absorbed by the loop. Fatal
//! faults abort startup before the loop ever runs.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;
use vigil_types::{Actuator, SensorFault};

use crate::config::ConfigError;

/// Top-level error type for the monitor pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Hardware or runtime could not be brought up.
    #[error("setup failed: {0}")]
    Setup(String),

    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A sensor read failed.
    #[error("sensor fault: {0}")]
    Sensor(#[from] SensorFault),

    /// An actuator write failed.
    #[error("actuator fault: {0}")]
    Actuator(#[from] ActuatorFault),

    /// Still image capture failed.
    #[error("capture fault: {0}")]
    Capture(#[from] CaptureFault),

    /// Alert delivery failed.
    #[error("notify fault: {0}")]
    Notify(#[from] NotifyFault),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a setup error with a custom message.
    pub fn setup(message: impl Into<String>) -> Self {
        Error::Setup(message.into())
    }

    /// Returns `true` if the error should abort startup rather than be
    /// absorbed by the monitor loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Setup(_) | Error::Config(_))
    }
}

/// Result alias for vigil-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fault raised when an actuator output write fails.
#[derive(Debug, Error)]
#[error("write to {actuator} failed: {reason}")]
pub struct ActuatorFault {
    pub actuator: Actuator,
    pub reason: String,
}

impl ActuatorFault {
    pub fn new(actuator: Actuator, reason: impl Into<String>) -> Self {
        Self {
            actuator,
            reason: reason.into(),
        }
    }
}

/// Faults raised while capturing a still image.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureFault {
    /// The capture command could not be started.
    #[error("could not start capture command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The capture command ran but exited unsuccessfully.
    #[error("capture command exited with {status}")]
    CommandFailed { status: ExitStatus },

    /// The command reported success but produced no image file.
    #[error("capture produced no image at {}", path.display())]
    MissingImage { path: PathBuf },
}

/// Faults raised while delivering an alert.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyFault {
    /// The HTTP request could not be completed.
    #[error("alert transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading the captured image from disk failed.
    #[error("could not read image for upload: {0}")]
    ImageRead(#[from] std::io::Error),

    /// The image host rejected the upload.
    #[error("image host rejected upload with status {status}")]
    UploadRejected { status: u16 },

    /// The SMS gateway rejected the message.
    #[error("SMS gateway rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
