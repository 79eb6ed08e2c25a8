//! Monitor lifecycle events.
//!
//! The monitor broadcasts one event per noteworthy occurrence on a tokio
//! broadcast channel. Subscribers that fall behind lose the oldest events
//! rather than blocking the loop.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vigil_types::{AlertKind, HazardVerdict};

/// Events emitted by the monitor loop and the escalation worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum MonitorEvent {
    /// A polling cycle finished.
    CycleCompleted {
        verdict: HazardVerdict,
        effective_temp_c: f32,
    },
    /// The fused verdict changed between cycles.
    VerdictChanged {
        from: HazardVerdict,
        to: HazardVerdict,
    },
    /// A sensor read failed or produced an implausible value.
    SensorFaulted { sensor: String, fault: String },
    /// An actuator write failed.
    ActuatorFaulted { fault: String },
    /// An alert was delivered.
    Escalated { kind: AlertKind },
    /// An alert could not be delivered.
    EscalationFailed { kind: AlertKind, error: String },
}

/// Sender half of the event channel.
pub type EventSender = broadcast::Sender<MonitorEvent>;
/// Receiver half of the event channel.
pub type EventReceiver = broadcast::Receiver<MonitorEvent>;

/// Broadcast fan-out for monitor events.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Broadcast an event. Dropped silently when nobody is listening.
    pub fn send(&self, event: MonitorEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
