//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`HandEvent`] as one
//! `TAG | key=value` line through the `log` facade.  A GUI or network
//! bridge would implement the same trait.

use log::{info, warn};

use crate::app::events::HandEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &HandEvent) {
        match event {
            HandEvent::ServoConfigured {
                id,
                firmware_version,
                temperature_c,
            } => {
                info!(
                    "SERVO | id={id} configured | fw={} | T={}\u{00b0}C",
                    firmware_version.map_or_else(|| "?".into(), |v| v.to_string()),
                    temperature_c.map_or_else(|| "?".into(), |t| t.to_string()),
                );
            }
            HandEvent::ServoRejected { id, failed_steps } => {
                let steps: Vec<String> = failed_steps.iter().map(ToString::to_string).collect();
                warn!("SERVO | id={id} rejected | failed=[{}]", steps.join(", "));
            }
            HandEvent::BringupComplete {
                configured,
                rejected,
            } => {
                info!("BRINGUP | configured={configured} rejected={rejected}");
            }
            HandEvent::TorqueChanged { ids, enabled } => {
                info!(
                    "TORQUE | {} | ids={ids:?}",
                    if *enabled { "ON" } else { "OFF" }
                );
            }
            HandEvent::MotionSent { ids, duration_ms } => {
                info!("MOTION | ids={ids:?} | t={duration_ms}ms");
            }
            HandEvent::CalibrationCommitted {
                finger,
                joint,
                offset,
            } => {
                info!("CALIB | {finger}/{joint} offset={offset}");
            }
        }
    }
}

/// Sink that keeps every event, for tests and for callers that poll.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    pub events: Vec<HandEvent>,
}

impl EventSink for RecordingEventSink {
    fn emit(&mut self, event: &HandEvent) {
        self.events.push(event.clone());
    }
}
