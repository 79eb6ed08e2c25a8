//! Shared data types for the vigil hazard monitor.
//!
//! This crate defines the sensor, verdict, and actuator vocabulary used by
//! every other vigil crate. It has no hardware or runtime dependencies and
//! compiles anywhere, including in host-side test suites.
//!
//! # Data flow
//!
//! ```text
//! SensorSample --classify--> HazardVerdict --drive--> ActuatorState
//!                                 |
//!                                 +--escalate--> AlertKind
//! ```
//!
//! # Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` on every type.

pub mod error;
pub mod types;

pub use error::{SensorFault, SensorResult};
pub use types::{Actuator, ActuatorState, AlertKind, HazardVerdict, SensorSample};
