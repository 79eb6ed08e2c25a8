//! Boundary traits between the monitor loop and its environment.
//!
//! Every external effect goes through one of these traits so the full
//! pipeline can run against mock backends in tests. Hardware-backed
//! implementations live in [`crate::rpi`]; the process and HTTP backed
//! implementations live in [`crate::capture`] and [`crate::notify`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use vigil_types::{Actuator, AlertKind, SensorResult};

use crate::error::{ActuatorFault, CaptureFault, NotifyFault};

/// Read access to the sensor suite.
///
/// Digital inputs cannot fail once their lines are claimed, so flame and
/// motion return plain levels. Bus-attached sensors return a
/// [`SensorResult`] and may fault on any cycle.
#[async_trait]
pub trait SensorHub: Send + Sync {
    /// Current flame detector level.
    async fn read_flame(&self) -> bool;

    /// Current motion detector level.
    async fn read_motion(&self) -> bool;

    /// Smoke density from the ADC, 0-255.
    async fn read_smoke(&self) -> SensorResult<u8>;

    /// Probe temperature in degrees Celsius.
    async fn read_temperature(&self) -> SensorResult<f32>;
}

/// Write access to the actuator outputs.
pub trait ActuatorPort: Send + Sync {
    /// Drive one output to the given level.
    fn write(&self, actuator: Actuator, on: bool) -> Result<(), ActuatorFault>;
}

impl<T: ActuatorPort + ?Sized> ActuatorPort for Arc<T> {
    fn write(&self, actuator: Actuator, on: bool) -> Result<(), ActuatorFault> {
        (**self).write(actuator, on)
    }
}

/// Location of a captured still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub path: PathBuf,
}

/// Still image capture.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Capture one still image and return where it landed.
    async fn capture_still(&self) -> Result<ImageHandle, CaptureFault>;
}

/// Everything an outbound alert carries.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    /// Alert category, used verbatim in the message body.
    pub kind: AlertKind,
    /// Temperature the classifier acted on, in °C.
    pub effective_temp_c: f32,
    /// Smoke level at the time of the transition, if the ADC was readable.
    pub smoke_level: Option<u8>,
    /// Motion detector level at the time of the transition.
    pub motion_detected: bool,
    /// Captured still image, when capture succeeded.
    pub image: Option<ImageHandle>,
    /// When the verdict transition was observed.
    pub raised_at: OffsetDateTime,
}

/// Outbound alert delivery.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert message.
    async fn notify(&self, alert: &AlertMessage) -> Result<(), NotifyFault>;
}
