//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! to the logger (UART / USB-CDC in production). A future telemetry
//! characteristic would implement the same trait.

use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`NodeEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        match event {
            NodeEvent::Started => info!("NODE | control core started"),
            NodeEvent::SessionOpened => info!("LINK | session opened"),
            NodeEvent::SessionClosed => info!("LINK | session closed"),
            NodeEvent::InterlockAsserted { battery_mv } => {
                warn!("UVP | interlock asserted at {} mV", battery_mv);
            }
            NodeEvent::InterlockCleared { battery_mv } => {
                info!("UVP | interlock cleared at {} mV", battery_mv);
            }
            NodeEvent::OutputEnabled => info!("PWM | bias output enabled"),
            NodeEvent::OutputDisabled => info!("PWM | bias output disabled"),
            NodeEvent::NotificationSent { handle } => {
                info!("NTF | sent on handle {}", handle);
            }
            NodeEvent::WriteRejected { handle, reason } => {
                warn!("ATT | write to handle {} dropped: {}", handle, reason);
            }
        }
    }
}
