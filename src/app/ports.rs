//! Hexagonal ports: the traits the application core depends on.
//!
//! The core never touches a peripheral directly. Hardware adapters
//! implement these on the target; the host build implements them over
//! an in-memory register bank so the whole control core runs in plain
//! `cargo test`.

use crate::app::events::NodeEvent;
use crate::control::Channel;
use crate::sensors::SamplingConfig;

/// ADC acquisition port.
pub trait AdcPort {
    /// Run one conversion with the given channel setup and return the
    /// raw accumulator value.
    fn acquire_raw(&mut self, cfg: &SamplingConfig) -> u16;
}

/// Timer/PWM register port.
///
/// Registers follow the hardware's conventions: the period register
/// stores period-minus-one and is shared by both channels; compare
/// ("end of active cycle") and phase-offset registers are per-channel.
pub trait PwmPort {
    fn period_reg(&self) -> u16;
    fn set_period_reg(&mut self, value: u16);

    fn phase_offset(&self, ch: Channel) -> u16;
    fn set_phase_offset(&mut self, ch: Channel, count: u16);

    fn compare(&self, ch: Channel) -> u16;
    fn set_compare(&mut self, ch: Channel, count: u16);

    /// Gate the timer input clock for the whole block.
    fn set_clock_enabled(&mut self, on: bool);
    /// Start/stop the output stage.
    fn set_output_running(&mut self, on: bool);
}

/// Power management port.
pub trait PowerPort {
    /// Hold the device out of sleep while the output stage runs.
    fn forbid_sleep(&mut self);
    fn allow_sleep(&mut self);
    /// Drive the sense amplifier rail. Dropped while the undervoltage
    /// interlock is asserted.
    fn set_rail_enabled(&mut self, on: bool);
}

/// Outbound attribute-protocol port.
pub trait NotifySink {
    /// Push a notification for a value handle.
    fn notify(&mut self, handle: u16, payload: &[u8]);
    /// Acknowledge a transport-level event indication. Housekeeping
    /// only, always confirmed immediately.
    fn confirm_event(&mut self, handle: u16);
    /// Complete a peer read with a status byte and value.
    fn read_confirm(&mut self, _handle: u16, _status: crate::error::AttStatus, _value: &[u8]) {}
}

/// Structured application event port (logging, telemetry).
pub trait EventSink {
    fn emit(&mut self, event: &NodeEvent);
}
