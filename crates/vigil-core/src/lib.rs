//! Core monitoring library for the Vigil hazard controller.
//!
//! This crate polls a set of environmental sensors (flame, motion, smoke,
//! temperature), fuses each cycle of readings into a [`HazardVerdict`],
//! drives the buzzer/pump/motor actuators to match, and escalates verdict
//! transitions into a camera capture plus an SMS alert.
//!
//! # Features
//!
//! - **Hazard classification**: edge-triggered flame/motion, debounced smoke,
//!   level-triggered temperature, fused with fire > smoke > theft priority
//! - **Idempotent actuation**: every output written every cycle, with a
//!   buzzer-on fail-safe when a write fails
//! - **Escalation pipeline**: latest-wins hand-off to a background worker
//!   that captures a still image and delivers an SMS alert
//! - **Hardware backends**: Raspberry Pi GPIO/I2C/one-wire implementations
//!   behind narrow traits, with mock implementations for testing
//! - **Observability**: broadcast [`MonitorEvent`]s and atomic counters for
//!   every cycle, fault, and escalation
//!
//! # Verdicts and actuators
//!
//! | Verdict | Buzzer | Pump | Motor |
//! |---------|--------|------|-------|
//! | `FireAlert` | on | on | follows motion |
//! | `SmokeAlert` | on | off | on |
//! | `TheftAlert` | on | off | off |
//! | `Clear` | off | off | off |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vigil_core::config::MonitorConfig;
//! use vigil_core::mock::{MockCamera, MockHub, MockPort, MockSink};
//! use vigil_core::monitor::Monitor;
//!
//! #[tokio::main]
//! async fn main() -> vigil_core::Result<()> {
//!     let config = MonitorConfig::default();
//!     let monitor = Monitor::new(
//!         Arc::new(MockHub::new()),
//!         Box::new(MockPort::new()),
//!         Arc::new(MockCamera::new()),
//!         Arc::new(MockSink::new()),
//!         &config,
//!     );
//!
//!     let cancel = CancellationToken::new();
//!     monitor.run(cancel).await
//! }
//! ```

pub mod actuator;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod metrics;
pub mod mock;
pub mod monitor;
pub mod notify;
#[cfg(target_os = "linux")]
pub mod rpi;
pub mod traits;

// Re-export the data model module from vigil-types so downstream crates
// only need one dependency.
pub use vigil_types::types;

// Core exports
pub use classifier::{Classification, HazardClassifier, HazardThresholds};
pub use config::{
    AlertConfig, ConfigError, MonitorConfig, PinConfig, SmokeBusConfig, TwilioConfig,
    ValidationError,
};
pub use error::{ActuatorFault, CaptureFault, Error, NotifyFault, Result};
pub use monitor::Monitor;
pub use traits::{ActuatorPort, AlertMessage, AlertSink, Camera, ImageHandle, SensorHub};

// Pipeline building blocks
pub use actuator::ActuatorDriver;
pub use capture::StillCamera;
pub use dispatcher::{should_escalate, EscalationDispatcher, DISPATCH_TIMEOUT};
pub use events::{EventDispatcher, EventReceiver, EventSender, MonitorEvent};
pub use metrics::{MetricsSnapshot, MonitorMetrics};
pub use mock::{MockCamera, MockHub, MockPort, MockSink};
pub use notify::{LogOnlySink, TwilioSink};

#[cfg(target_os = "linux")]
pub use rpi::{RpiActuatorPort, RpiSensorHub};

// Re-export from vigil-types
pub use vigil_types::{
    Actuator, ActuatorState, AlertKind, HazardVerdict, SensorFault, SensorResult, SensorSample,
};
