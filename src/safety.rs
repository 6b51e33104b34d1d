//! Undervoltage safety interlock.
//!
//! A two-threshold hysteretic latch over the battery rail:
//!
//! ```text
//!             < shutdown_mv                >= restart_mv
//!   Normal ──────────────────► ShutDown ──────────────────► Normal
//!                   (readings in between hold the state)
//! ```
//!
//! The monitor is the only writer of the interlock flag. Every
//! mutating entry point in the firmware reads it; while asserted, no
//! write may change output state and the sensor/bias schedules must be
//! stopped. Those side effects live in the service layer, this module
//! owns only the decision.

use log::{error, info};

/// Interlock latch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UvpState {
    #[default]
    Normal,
    ShutDown,
}

/// Outcome of one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvpTransition {
    /// State unchanged (including readings inside the hysteresis band).
    None,
    EnteredShutDown,
    EnteredNormal,
}

/// Hysteretic undervoltage monitor.
pub struct UndervoltageMonitor {
    state: UvpState,
    shutdown_mv: u16,
    restart_mv: u16,
    sense_offset_mv: u16,
}

impl UndervoltageMonitor {
    /// `restart_mv` must sit above `shutdown_mv`; config validation
    /// enforces this before construction.
    pub fn new(shutdown_mv: u16, restart_mv: u16, sense_offset_mv: u16) -> Self {
        debug_assert!(restart_mv > shutdown_mv);
        Self {
            state: UvpState::Normal,
            shutdown_mv,
            restart_mv,
            sense_offset_mv,
        }
    }

    pub fn state(&self) -> UvpState {
        self.state
    }

    /// True while mutating writes and output schedules must be blocked.
    pub fn interlock(&self) -> bool {
        self.state == UvpState::ShutDown
    }

    /// Feed one battery reading through the latch.
    ///
    /// The sense offset compensates the divider's systematic error
    /// before either threshold is compared. Both thresholds are
    /// checked every cycle; inside the band the state holds.
    pub fn evaluate(&mut self, battery_mv: u16) -> UvpTransition {
        let compensated = battery_mv.saturating_sub(self.sense_offset_mv);

        match self.state {
            UvpState::Normal if compensated < self.shutdown_mv => {
                self.state = UvpState::ShutDown;
                error!(
                    "UVP | battery {} mV below shutdown threshold {} mV, interlock asserted",
                    compensated, self.shutdown_mv
                );
                UvpTransition::EnteredShutDown
            }
            UvpState::ShutDown if compensated >= self.restart_mv => {
                self.state = UvpState::Normal;
                info!(
                    "UVP | battery {} mV recovered past {} mV, interlock cleared",
                    compensated, self.restart_mv
                );
                UvpTransition::EnteredNormal
            }
            _ => UvpTransition::None,
        }
    }
}
