//! The polling monitor loop.
//!
//! One [`Monitor`] owns the whole pipeline: read every sensor, classify,
//! drive the actuators, and hand verdict transitions to the escalation
//! dispatcher. The loop runs on a fixed interval until cancelled, then
//! deactivates every output on the way out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_types::{HazardVerdict, SensorResult, SensorSample};

use crate::actuator::ActuatorDriver;
use crate::classifier::{Classification, HazardClassifier};
use crate::config::MonitorConfig;
use crate::dispatcher::EscalationDispatcher;
use crate::error::Result;
use crate::events::{EventDispatcher, MonitorEvent};
use crate::metrics::MonitorMetrics;
use crate::traits::{ActuatorPort, AlertSink, Camera, SensorHub};

/// Owns and runs the hazard monitoring pipeline.
pub struct Monitor {
    hub: Arc<dyn SensorHub>,
    classifier: HazardClassifier,
    driver: ActuatorDriver,
    dispatcher: EscalationDispatcher,
    events: EventDispatcher,
    metrics: Arc<MonitorMetrics>,
    poll_interval: Duration,
    previous_verdict: HazardVerdict,
    smoke_failures: u32,
    temperature_failures: u32,
}

impl Monitor {
    pub fn new(
        hub: Arc<dyn SensorHub>,
        port: Box<dyn ActuatorPort>,
        camera: Arc<dyn Camera>,
        sink: Arc<dyn AlertSink>,
        config: &MonitorConfig,
    ) -> Self {
        let events = EventDispatcher::default();
        let metrics = MonitorMetrics::shared();
        let dispatcher =
            EscalationDispatcher::new(camera, sink, events.clone(), Arc::clone(&metrics));
        Self {
            hub,
            classifier: HazardClassifier::new(config.thresholds),
            driver: ActuatorDriver::new(port),
            dispatcher,
            events,
            metrics,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            previous_verdict: HazardVerdict::Clear,
            smoke_failures: 0,
            temperature_failures: 0,
        }
    }

    /// Event fan-out for this monitor.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Shared handle to the runtime counters.
    pub fn metrics(&self) -> Arc<MonitorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until cancelled. The first cycle starts immediately.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "hazard monitor started"
        );
        let mut ticker = interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown requested, stopping monitor");
                    break;
                }
                _ = ticker.tick() => {
                    self.cycle().await;
                }
            }
        }
        self.shutdown()
    }

    async fn cycle(&mut self) {
        let sample = self.read_sample().await;
        let Classification {
            verdict,
            effective_temp_c,
            temperature_fault,
        } = self.classifier.classify(&sample);

        if let Some(fault) = temperature_fault {
            warn!(error = %fault, "temperature reading rejected");
            self.metrics.record_sensor_fault();
            self.events.send(MonitorEvent::SensorFaulted {
                sensor: "temperature".to_string(),
                fault: fault.to_string(),
            });
        }

        self.metrics.record_cycle(verdict);

        match self.driver.apply(verdict, sample.motion_detected) {
            Ok(state) => {
                debug!(
                    %verdict,
                    buzzer = state.buzzer,
                    pump = state.pump,
                    motor = state.motor,
                    temp_c = effective_temp_c,
                    "cycle complete"
                );
            }
            Err(fault) => {
                warn!(error = %fault, "actuator write failed, forcing fail-safe");
                self.metrics.record_actuator_fault();
                self.events.send(MonitorEvent::ActuatorFaulted {
                    fault: fault.to_string(),
                });
                self.driver.fail_safe();
            }
        }

        self.dispatcher
            .on_transition(verdict, self.previous_verdict, &sample, effective_temp_c);

        if verdict != self.previous_verdict {
            info!(from = %self.previous_verdict, to = %verdict, "verdict changed");
            self.events.send(MonitorEvent::VerdictChanged {
                from: self.previous_verdict,
                to: verdict,
            });
            self.previous_verdict = verdict;
        }

        self.events.send(MonitorEvent::CycleCompleted {
            verdict,
            effective_temp_c,
        });
    }

    async fn read_sample(&mut self) -> SensorSample {
        let flame_detected = self.hub.read_flame().await;
        let motion_detected = self.hub.read_motion().await;
        let (smoke, temperature) = tokio::join!(self.hub.read_smoke(), self.hub.read_temperature());

        let smoke_level = absorb_fault(
            smoke,
            "smoke",
            &mut self.smoke_failures,
            &self.metrics,
            &self.events,
        );
        let temperature_c = absorb_fault(
            temperature,
            "temperature",
            &mut self.temperature_failures,
            &self.metrics,
            &self.events,
        );

        SensorSample {
            flame_detected,
            motion_detected,
            smoke_level,
            temperature_c,
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.dispatcher.close();
        let outcome = self.driver.shutdown();
        if let Err(fault) = &outcome {
            warn!(error = %fault, "could not deactivate every actuator on shutdown");
        }
        let snapshot = self.metrics.snapshot();
        info!(
            cycles = snapshot.cycles,
            fire_cycles = snapshot.fire_cycles,
            smoke_cycles = snapshot.smoke_cycles,
            theft_cycles = snapshot.theft_cycles,
            sensor_faults = snapshot.sensor_faults,
            actuator_faults = snapshot.actuator_faults,
            escalations_sent = snapshot.escalations_sent,
            escalations_failed = snapshot.escalations_failed,
            "hazard monitor stopped"
        );
        outcome.map_err(Into::into)
    }
}

/// Record one sensor read outcome, degrading repeat-failure logging to
/// debug level until the sensor recovers.
fn absorb_fault<T>(
    result: SensorResult<T>,
    sensor: &str,
    failures: &mut u32,
    metrics: &MonitorMetrics,
    events: &EventDispatcher,
) -> Option<T> {
    match result {
        Ok(value) => {
            if *failures > 0 {
                info!(sensor, failures = *failures, "sensor recovered");
                *failures = 0;
            }
            Some(value)
        }
        Err(fault) => {
            *failures += 1;
            if *failures == 1 {
                warn!(sensor, error = %fault, "sensor read failed");
            } else {
                debug!(sensor, error = %fault, failures = *failures, "sensor still failing");
            }
            metrics.record_sensor_fault();
            events.send(MonitorEvent::SensorFaulted {
                sensor: sensor.to_string(),
                fault: fault.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCamera, MockHub, MockPort, MockSink};
    use vigil_types::ActuatorState;

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel_and_deactivates() {
        let hub = Arc::new(MockHub::new());
        hub.set_sample(SensorSample {
            flame_detected: false,
            motion_detected: false,
            smoke_level: Some(10),
            temperature_c: Some(20.0),
        })
        .await;
        let port = Arc::new(MockPort::new());
        let monitor = Monitor::new(
            hub,
            Box::new(Arc::clone(&port)),
            Arc::new(MockCamera::new()),
            Arc::new(MockSink::new()),
            &MonitorConfig::default(),
        );
        let mut events = monitor.events().subscribe();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(cancel.clone()));

        loop {
            if let MonitorEvent::CycleCompleted { .. } = events.recv().await.unwrap() {
                break;
            }
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(port.last_state(), ActuatorState::off());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_sensor_failures_keep_counting() {
        let hub = Arc::new(MockHub::new());
        hub.set_smoke_fault(true);
        hub.set_temperature(20.0).await;
        let monitor = Monitor::new(
            Arc::clone(&hub) as Arc<dyn SensorHub>,
            Box::new(MockPort::new()),
            Arc::new(MockCamera::new()),
            Arc::new(MockSink::new()),
            &MonitorConfig::default(),
        );
        let metrics = monitor.metrics();
        let mut events = monitor.events().subscribe();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(cancel.clone()));

        let mut cycles = 0;
        while cycles < 3 {
            if let MonitorEvent::CycleCompleted { verdict, .. } = events.recv().await.unwrap() {
                assert_eq!(verdict, HazardVerdict::Clear);
                cycles += 1;
            }
        }
        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert!(metrics.snapshot().sensor_faults >= 3);
    }
}
