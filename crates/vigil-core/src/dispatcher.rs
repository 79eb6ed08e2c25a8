//! Alert escalation.
//!
//! Escalation runs on a dedicated worker so a slow capture or HTTP call can
//! never stall the polling loop. Hand-off is a single-slot watch channel:
//! while one dispatch is in flight, newer requests overwrite the slot and
//! only the latest is dispatched afterwards.
//!
//! Every failure inside a dispatch is absorbed. A failed capture degrades
//! the alert to text-only; a failed delivery is logged, counted, and
//! reported as an event while the monitor keeps running.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_types::{HazardVerdict, SensorSample};

use crate::error::NotifyFault;
use crate::events::{EventDispatcher, MonitorEvent};
use crate::metrics::MonitorMetrics;
use crate::traits::{AlertMessage, AlertSink, Camera};

/// Hard ceiling on one capture-and-notify round.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A verdict change escalates when the new verdict is a hazard. A hazard
/// persisting unchanged does not re-fire; a switch between two hazard kinds
/// does.
pub fn should_escalate(verdict: HazardVerdict, previous: HazardVerdict) -> bool {
    verdict.is_hazard() && verdict != previous
}

/// Owns the escalation worker and decides when to fire.
pub struct EscalationDispatcher {
    tx: watch::Sender<Option<AlertMessage>>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl EscalationDispatcher {
    /// Spawn the worker. It runs until [`EscalationDispatcher::close`].
    pub fn new(
        camera: Arc<dyn Camera>,
        sink: Arc<dyn AlertSink>,
        events: EventDispatcher,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(worker_loop(
            rx,
            camera,
            sink,
            events,
            metrics,
            cancel.clone(),
        ));
        Self { tx, cancel, worker }
    }

    /// Request escalation when a verdict transition warrants it.
    ///
    /// Returns whether a dispatch was handed to the worker.
    pub fn on_transition(
        &self,
        verdict: HazardVerdict,
        previous: HazardVerdict,
        sample: &SensorSample,
        effective_temp_c: f32,
    ) -> bool {
        if !should_escalate(verdict, previous) {
            return false;
        }
        let Some(kind) = verdict.alert_kind() else {
            return false;
        };
        let message = AlertMessage {
            kind,
            effective_temp_c,
            smoke_level: sample.smoke_level,
            motion_detected: sample.motion_detected,
            image: None,
            raised_at: OffsetDateTime::now_utc(),
        };
        if self.tx.send(Some(message)).is_err() {
            warn!(%kind, "escalation worker is gone, alert dropped");
            return false;
        }
        debug!(%kind, "escalation requested");
        true
    }

    /// Stop the worker. In-flight work is abandoned.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether the worker has exited.
    pub fn is_closed(&self) -> bool {
        self.worker.is_finished()
    }
}

async fn worker_loop(
    mut rx: watch::Receiver<Option<AlertMessage>>,
    camera: Arc<dyn Camera>,
    sink: Arc<dyn AlertSink>,
    events: EventDispatcher,
    metrics: Arc<MonitorMetrics>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(message) = rx.borrow_and_update().clone() else {
                    continue;
                };
                let kind = message.kind;
                let outcome = tokio::time::timeout(
                    DISPATCH_TIMEOUT,
                    dispatch(camera.as_ref(), sink.as_ref(), message),
                )
                .await;
                match outcome {
                    Ok(Ok(())) => {
                        metrics.record_escalation_sent();
                        events.send(MonitorEvent::Escalated { kind });
                    }
                    Ok(Err(error)) => {
                        warn!(%kind, %error, "alert delivery failed");
                        metrics.record_escalation_failed();
                        events.send(MonitorEvent::EscalationFailed {
                            kind,
                            error: error.to_string(),
                        });
                    }
                    Err(_) => {
                        warn!(
                            %kind,
                            timeout_s = DISPATCH_TIMEOUT.as_secs(),
                            "alert dispatch timed out"
                        );
                        metrics.record_escalation_failed();
                        events.send(MonitorEvent::EscalationFailed {
                            kind,
                            error: "dispatch timed out".to_string(),
                        });
                    }
                }
            }
        }
    }
    debug!("escalation worker stopped");
}

async fn dispatch(
    camera: &dyn Camera,
    sink: &dyn AlertSink,
    mut message: AlertMessage,
) -> Result<(), NotifyFault> {
    info!(kind = %message.kind, "escalating hazard alert");
    match camera.capture_still().await {
        Ok(image) => message.image = Some(image),
        Err(error) => {
            warn!(kind = %message.kind, %error, "image capture failed, sending text-only alert");
        }
    }
    sink.notify(&message).await?;
    info!(kind = %message.kind, with_image = message.image.is_some(), "alert delivered");
    Ok(())
}
