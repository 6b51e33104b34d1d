//! Structured application events emitted by the service layer.

use crate::error::WriteReject;

/// Everything externally notable the node does, as plain data. Sinks
/// decide how to surface them (serial log today).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// Control core finished startup.
    Started,
    /// A peer session opened.
    SessionOpened,
    /// The peer session ended; output and sensor schedules stop.
    SessionClosed,
    /// Undervoltage interlock asserted at this compensated reading.
    InterlockAsserted { battery_mv: u16 },
    /// Battery recovered past the restart threshold.
    InterlockCleared { battery_mv: u16 },
    /// Bias output stage started.
    OutputEnabled,
    /// Bias output stage stopped.
    OutputDisabled,
    /// A voltage notification went out on this value handle.
    NotificationSent { handle: u16 },
    /// A write was dropped; the reason is diagnosable, never fatal.
    WriteRejected { handle: u16, reason: WriteReject },
}
