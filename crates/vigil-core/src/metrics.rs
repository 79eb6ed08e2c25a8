//! Runtime counters for the monitor loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use vigil_types::HazardVerdict;

/// Cumulative counters updated by the monitor loop and the escalation
/// worker. Updates are relaxed; totals are read for logging and inspection,
/// never for control flow.
#[derive(Debug, Default)]
pub struct MonitorMetrics {
    cycles: AtomicU64,
    fire_cycles: AtomicU64,
    smoke_cycles: AtomicU64,
    theft_cycles: AtomicU64,
    sensor_faults: AtomicU64,
    actuator_faults: AtomicU64,
    escalations_sent: AtomicU64,
    escalations_failed: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the usual shared ownership.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one finished cycle under its verdict.
    pub fn record_cycle(&self, verdict: HazardVerdict) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        match verdict {
            HazardVerdict::FireAlert => {
                self.fire_cycles.fetch_add(1, Ordering::Relaxed);
            }
            HazardVerdict::SmokeAlert => {
                self.smoke_cycles.fetch_add(1, Ordering::Relaxed);
            }
            HazardVerdict::TheftAlert => {
                self.theft_cycles.fetch_add(1, Ordering::Relaxed);
            }
            HazardVerdict::Clear => {}
        }
    }

    pub fn record_sensor_fault(&self) {
        self.sensor_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_actuator_fault(&self) {
        self.actuator_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_escalation_sent(&self) {
        self.escalations_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_escalation_failed(&self) {
        self.escalations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            fire_cycles: self.fire_cycles.load(Ordering::Relaxed),
            smoke_cycles: self.smoke_cycles.load(Ordering::Relaxed),
            theft_cycles: self.theft_cycles.load(Ordering::Relaxed),
            sensor_faults: self.sensor_faults.load(Ordering::Relaxed),
            actuator_faults: self.actuator_faults.load(Ordering::Relaxed),
            escalations_sent: self.escalations_sent.load(Ordering::Relaxed),
            escalations_failed: self.escalations_failed.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.fire_cycles.store(0, Ordering::Relaxed);
        self.smoke_cycles.store(0, Ordering::Relaxed);
        self.theft_cycles.store(0, Ordering::Relaxed);
        self.sensor_faults.store(0, Ordering::Relaxed);
        self.actuator_faults.store(0, Ordering::Relaxed);
        self.escalations_sent.store(0, Ordering::Relaxed);
        self.escalations_failed.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`MonitorMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub fire_cycles: u64,
    pub smoke_cycles: u64,
    pub theft_cycles: u64,
    pub sensor_faults: u64,
    pub actuator_faults: u64,
    pub escalations_sent: u64,
    pub escalations_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cycle_counts_by_verdict() {
        let metrics = MonitorMetrics::new();
        metrics.record_cycle(HazardVerdict::Clear);
        metrics.record_cycle(HazardVerdict::FireAlert);
        metrics.record_cycle(HazardVerdict::FireAlert);
        metrics.record_cycle(HazardVerdict::SmokeAlert);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles, 4);
        assert_eq!(snapshot.fire_cycles, 2);
        assert_eq!(snapshot.smoke_cycles, 1);
        assert_eq!(snapshot.theft_cycles, 0);
    }

    #[test]
    fn test_fault_and_escalation_counters() {
        let metrics = MonitorMetrics::new();
        metrics.record_sensor_fault();
        metrics.record_sensor_fault();
        metrics.record_actuator_fault();
        metrics.record_escalation_sent();
        metrics.record_escalation_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sensor_faults, 2);
        assert_eq!(snapshot.actuator_faults, 1);
        assert_eq!(snapshot.escalations_sent, 1);
        assert_eq!(snapshot.escalations_failed, 1);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let metrics = MonitorMetrics::new();
        metrics.record_cycle(HazardVerdict::TheftAlert);
        metrics.record_sensor_fault();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot {
            cycles: 0,
            fire_cycles: 0,
            smoke_cycles: 0,
            theft_cycles: 0,
            sensor_faults: 0,
            actuator_faults: 0,
            escalations_sent: 0,
            escalations_failed: 0,
        });
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let metrics = MonitorMetrics::shared();
        let clone = Arc::clone(&metrics);
        clone.record_cycle(HazardVerdict::Clear);
        assert_eq!(metrics.snapshot().cycles, 1);
    }
}
