//! Example: Running the Monitor on Mock Hardware
//!
//! This example runs the full monitoring pipeline on a host machine with
//! nothing wired up: scripted sensors, a recording actuator port, and mock
//! capture and delivery. It lets a few quiet cycles pass, scripts a brief
//! flame, and shows the verdict transitions and the alert that escalation
//! delivered.
//!
//! Run with: `cargo run --example mock_monitor`

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vigil_core::{
    AlertSink, MockCamera, MockHub, MockPort, MockSink, Monitor, MonitorConfig, MonitorEvent,
    SensorHub,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let hub = Arc::new(MockHub::new());
    let port = Arc::new(MockPort::new());
    let sink = Arc::new(MockSink::new());

    let mut config = MonitorConfig::default();
    config.poll_interval_ms = 200;

    let monitor = Monitor::new(
        Arc::clone(&hub) as Arc<dyn SensorHub>,
        Box::new(Arc::clone(&port)),
        Arc::new(MockCamera::new()),
        Arc::clone(&sink) as Arc<dyn AlertSink>,
        &config,
    );
    let mut events = monitor.events().subscribe();
    let cancel = CancellationToken::new();

    // Print the interesting events as they arrive.
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                MonitorEvent::VerdictChanged { from, to } => {
                    println!("verdict: {from} -> {to}");
                }
                MonitorEvent::Escalated { kind } => {
                    println!("escalated: {kind}");
                }
                MonitorEvent::EscalationFailed { kind, error } => {
                    println!("escalation failed for {kind}: {error}");
                }
                _ => {}
            }
        }
    });

    let handle = tokio::spawn(monitor.run(cancel.clone()));

    // A few quiet cycles, then a brief flame.
    tokio::time::sleep(Duration::from_millis(600)).await;
    println!("Scripting a flame blip...");
    hub.set_flame(true);
    tokio::time::sleep(Duration::from_millis(300)).await;
    hub.set_flame(false);
    tokio::time::sleep(Duration::from_millis(600)).await;

    cancel.cancel();
    handle.await??;
    printer.abort();

    println!();
    println!("Actuator writes recorded: {}", port.write_count());
    for alert in sink.delivered() {
        println!(
            "Alert delivered: {} at {:.1} °C (with image: {})",
            alert.kind,
            alert.effective_temp_c,
            alert.image.is_some()
        );
    }

    Ok(())
}
