//! Notification publisher.
//!
//! Pushes a cached measurement to the peer when, and only when, the
//! peer subscribed (CCCD written to `0x0001`) and a session is active.
//! The gate is re-checked at every send; CCCD values other than the
//! plain notify bit are stored by the dispatcher but never publish.

use crate::app::ports::NotifySink;
use crate::sensors::Measurement;

/// CCCD value enabling notifications.
pub const CCCD_SUBSCRIBE: u16 = 0x0001;
/// CCCD value disabling them.
pub const CCCD_NONE: u16 = 0x0000;

/// Wire encoding of a voltage value: millivolts, little-endian.
pub fn encode_measurement(m: Measurement) -> [u8; 2] {
    m.millivolts.to_le_bytes()
}

/// Push `measurement` on `value_handle` if the gate passes.
/// Returns whether a notification actually went out.
pub fn publish(
    sink: &mut impl NotifySink,
    value_handle: u16,
    measurement: Measurement,
    cccd: u16,
    session_active: bool,
) -> bool {
    if !session_active || cccd != CCCD_SUBSCRIBE {
        return false;
    }
    sink.notify(value_handle, &encode_measurement(measurement));
    true
}
