//! Mock backends for tests and host-side development.
//!
//! These mirror the real backends closely enough that the whole monitor
//! pipeline can run against them: scripted sensor levels, recorded actuator
//! writes, and injectable faults on every boundary.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;
use vigil_types::{Actuator, ActuatorState, SensorFault, SensorResult, SensorSample};

use crate::error::{ActuatorFault, CaptureFault, NotifyFault};
use crate::traits::{ActuatorPort, AlertMessage, AlertSink, Camera, ImageHandle, SensorHub};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted sensor hub.
///
/// Digital levels and the smoke level are plain atomics; the temperature
/// sits behind a lock because there is no atomic f32. [`MockHub::set_sample`]
/// scripts everything at once, mapping an absent reading to an injected
/// fault on the corresponding sensor.
#[derive(Debug)]
pub struct MockHub {
    flame: AtomicBool,
    motion: AtomicBool,
    smoke_level: AtomicU8,
    temperature_c: RwLock<f32>,
    smoke_fault: AtomicBool,
    temperature_fault: AtomicBool,
    smoke_reads: AtomicU32,
    temperature_reads: AtomicU32,
}

impl MockHub {
    /// Creates a hub reporting a calm room: no flame, no motion, no smoke,
    /// 25.0°C ambient.
    pub fn new() -> Self {
        Self {
            flame: AtomicBool::new(false),
            motion: AtomicBool::new(false),
            smoke_level: AtomicU8::new(0),
            temperature_c: RwLock::new(25.0),
            smoke_fault: AtomicBool::new(false),
            temperature_fault: AtomicBool::new(false),
            smoke_reads: AtomicU32::new(0),
            temperature_reads: AtomicU32::new(0),
        }
    }

    /// Script every sensor at once. `None` readings become injected faults.
    pub async fn set_sample(&self, sample: SensorSample) {
        self.flame.store(sample.flame_detected, Ordering::SeqCst);
        self.motion.store(sample.motion_detected, Ordering::SeqCst);
        match sample.smoke_level {
            Some(level) => {
                self.smoke_level.store(level, Ordering::SeqCst);
                self.smoke_fault.store(false, Ordering::SeqCst);
            }
            None => self.smoke_fault.store(true, Ordering::SeqCst),
        }
        match sample.temperature_c {
            Some(value) => {
                *self.temperature_c.write().await = value;
                self.temperature_fault.store(false, Ordering::SeqCst);
            }
            None => self.temperature_fault.store(true, Ordering::SeqCst),
        }
    }

    pub fn set_flame(&self, level: bool) {
        self.flame.store(level, Ordering::SeqCst);
    }

    pub fn set_motion(&self, level: bool) {
        self.motion.store(level, Ordering::SeqCst);
    }

    pub fn set_smoke_level(&self, level: u8) {
        self.smoke_level.store(level, Ordering::SeqCst);
        self.smoke_fault.store(false, Ordering::SeqCst);
    }

    pub async fn set_temperature(&self, value: f32) {
        *self.temperature_c.write().await = value;
        self.temperature_fault.store(false, Ordering::SeqCst);
    }

    /// Make smoke reads fail until cleared.
    pub fn set_smoke_fault(&self, failing: bool) {
        self.smoke_fault.store(failing, Ordering::SeqCst);
    }

    /// Make temperature reads fail until cleared.
    pub fn set_temperature_fault(&self, failing: bool) {
        self.temperature_fault.store(failing, Ordering::SeqCst);
    }

    pub fn smoke_reads(&self) -> u32 {
        self.smoke_reads.load(Ordering::SeqCst)
    }

    pub fn temperature_reads(&self) -> u32 {
        self.temperature_reads.load(Ordering::SeqCst)
    }
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorHub for MockHub {
    async fn read_flame(&self) -> bool {
        self.flame.load(Ordering::SeqCst)
    }

    async fn read_motion(&self) -> bool {
        self.motion.load(Ordering::SeqCst)
    }

    async fn read_smoke(&self) -> SensorResult<u8> {
        self.smoke_reads.fetch_add(1, Ordering::SeqCst);
        if self.smoke_fault.load(Ordering::SeqCst) {
            return Err(SensorFault::BusRead {
                channel: 1,
                reason: "injected fault".to_string(),
            });
        }
        Ok(self.smoke_level.load(Ordering::SeqCst))
    }

    async fn read_temperature(&self) -> SensorResult<f32> {
        self.temperature_reads.fetch_add(1, Ordering::SeqCst);
        if self.temperature_fault.load(Ordering::SeqCst) {
            return Err(SensorFault::NoDevice {
                kind: "injected fault".to_string(),
            });
        }
        Ok(*self.temperature_c.read().await)
    }
}

/// Recording actuator port.
#[derive(Debug, Default)]
pub struct MockPort {
    writes: Mutex<Vec<(Actuator, bool)>>,
    state: Mutex<ActuatorState>,
    failing: Mutex<Option<Actuator>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes to one actuator fail until cleared.
    pub fn set_failing(&self, actuator: Option<Actuator>) {
        *lock(&self.failing) = actuator;
    }

    /// Every successful write in order.
    pub fn writes(&self) -> Vec<(Actuator, bool)> {
        lock(&self.writes).clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.writes).len()
    }

    pub fn clear_writes(&self) {
        lock(&self.writes).clear();
    }

    /// Levels as of the last successful write to each output.
    pub fn last_state(&self) -> ActuatorState {
        *lock(&self.state)
    }
}

impl ActuatorPort for MockPort {
    fn write(&self, actuator: Actuator, on: bool) -> Result<(), ActuatorFault> {
        if *lock(&self.failing) == Some(actuator) {
            return Err(ActuatorFault::new(actuator, "injected fault"));
        }
        lock(&self.writes).push((actuator, on));
        let mut state = lock(&self.state);
        match actuator {
            Actuator::Buzzer => state.buzzer = on,
            Actuator::Pump => state.pump = on,
            Actuator::Motor => state.motor = on,
        }
        Ok(())
    }
}

/// Scripted camera.
#[derive(Debug)]
pub struct MockCamera {
    path: PathBuf,
    should_fail: AtomicBool,
    latency_ms: AtomicU64,
    captures: AtomicU32,
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/tmp/mock-capture.jpg"),
            should_fail: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            captures: AtomicU32::new(0),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::new()
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Artificial capture latency, for scheduling-sensitive tests.
    pub fn set_latency_ms(&self, ms: u64) {
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    pub fn capture_count(&self) -> u32 {
        self.captures.load(Ordering::SeqCst)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn capture_still(&self) -> Result<ImageHandle, CaptureFault> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency)).await;
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(CaptureFault::MissingImage {
                path: self.path.clone(),
            });
        }
        Ok(ImageHandle {
            path: self.path.clone(),
        })
    }
}

/// Recording alert sink.
#[derive(Debug, Default)]
pub struct MockSink {
    delivered: Mutex<Vec<AlertMessage>>,
    should_fail: AtomicBool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Every delivered alert in order.
    pub fn delivered(&self) -> Vec<AlertMessage> {
        lock(&self.delivered).clone()
    }

    pub fn delivered_count(&self) -> usize {
        lock(&self.delivered).len()
    }
}

#[async_trait]
impl AlertSink for MockSink {
    async fn notify(&self, alert: &AlertMessage) -> Result<(), NotifyFault> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotifyFault::Rejected {
                status: 503,
                body: "injected failure".to_string(),
            });
        }
        lock(&self.delivered).push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::AlertKind;

    #[tokio::test]
    async fn test_hub_scripts_whole_samples() {
        let hub = MockHub::new();
        hub.set_sample(SensorSample {
            flame_detected: true,
            motion_detected: false,
            smoke_level: Some(200),
            temperature_c: Some(42.5),
        })
        .await;

        assert!(hub.read_flame().await);
        assert!(!hub.read_motion().await);
        assert_eq!(hub.read_smoke().await.unwrap(), 200);
        assert_eq!(hub.read_temperature().await.unwrap(), 42.5);
        assert_eq!(hub.smoke_reads(), 1);
        assert_eq!(hub.temperature_reads(), 1);
    }

    #[tokio::test]
    async fn test_hub_maps_absent_readings_to_faults() {
        let hub = MockHub::new();
        hub.set_sample(SensorSample {
            smoke_level: None,
            temperature_c: None,
            ..SensorSample::default()
        })
        .await;

        assert!(hub.read_smoke().await.is_err());
        assert!(hub.read_temperature().await.is_err());
    }

    #[tokio::test]
    async fn test_hub_fault_injection_clears() {
        let hub = MockHub::new();
        hub.set_smoke_fault(true);
        assert!(hub.read_smoke().await.is_err());
        hub.set_smoke_level(50);
        assert_eq!(hub.read_smoke().await.unwrap(), 50);
    }

    #[test]
    fn test_port_records_writes_and_state() {
        let port = MockPort::new();
        port.write(Actuator::Buzzer, true).unwrap();
        port.write(Actuator::Buzzer, false).unwrap();
        assert_eq!(port.write_count(), 2);
        assert!(!port.last_state().buzzer);
    }

    #[test]
    fn test_port_failure_is_scoped_to_one_actuator() {
        let port = MockPort::new();
        port.set_failing(Some(Actuator::Motor));
        assert!(port.write(Actuator::Motor, true).is_err());
        assert!(port.write(Actuator::Pump, true).is_ok());
        port.set_failing(None);
        assert!(port.write(Actuator::Motor, true).is_ok());
    }

    #[tokio::test]
    async fn test_camera_failure_injection() {
        let camera = MockCamera::new();
        assert!(camera.capture_still().await.is_ok());
        camera.set_should_fail(true);
        assert!(camera.capture_still().await.is_err());
        assert_eq!(camera.capture_count(), 2);
    }

    #[tokio::test]
    async fn test_sink_records_deliveries() {
        let sink = MockSink::new();
        let alert = AlertMessage {
            kind: AlertKind::Fire,
            effective_temp_c: 61.0,
            smoke_level: Some(180),
            motion_detected: true,
            image: None,
            raised_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        sink.notify(&alert).await.unwrap();
        assert_eq!(sink.delivered_count(), 1);
        assert_eq!(sink.delivered()[0].kind, AlertKind::Fire);

        sink.set_should_fail(true);
        assert!(sink.notify(&alert).await.is_err());
        assert_eq!(sink.delivered_count(), 1);
    }
}
