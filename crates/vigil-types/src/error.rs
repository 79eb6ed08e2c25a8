//! Sensor fault types.

use thiserror::Error;

/// Faults raised by sensor backends.
///
/// A fault never stops the monitor loop. The faulted reading is recorded as
/// absent for the cycle and classification proceeds with what remains.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SensorFault {
    /// Writing the channel-select byte to the ADC failed.
    #[error("ADC channel {channel} select write failed: {reason}")]
    BusWrite { channel: u8, reason: String },

    /// Reading a converted value from the ADC failed.
    #[error("ADC channel {channel} read failed: {reason}")]
    BusRead { channel: u8, reason: String },

    /// The expected device is missing from the bus.
    #[error("sensor device not present: {kind}")]
    NoDevice { kind: String },

    /// The device produced output that could not be parsed.
    #[error("malformed sensor output: {detail}")]
    Malformed { detail: String },

    /// A reading fell outside the plausible physical range.
    #[error("temperature {value_c}°C outside plausible range {min_c}°C to {max_c}°C")]
    OutOfRange { value_c: f32, min_c: f32, max_c: f32 },
}

/// Result alias for sensor reads.
pub type SensorResult<T> = Result<T, SensorFault>;
