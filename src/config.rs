//! Node configuration.
//!
//! One plain-data struct covering the tunable constants of the control
//! core: protection thresholds, control-law guards, and the periodic
//! cadences. Serialisable both as JSON (provisioning, diagnostics) and
//! postcard (compact retained storage). Defaults reproduce the shipped
//! hardware calibration.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::sensors::SamplingConfig;

/// Base scheduler tick, milliseconds.
pub const TICK_UNIT_MS: u32 = 10;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Interlock asserts below this compensated battery level.
    pub uvp_shutdown_mv: u16,
    /// Interlock clears at or above this level. Must exceed
    /// `uvp_shutdown_mv`; the gap is the hysteresis band.
    pub uvp_restart_mv: u16,
    /// Systematic divider error subtracted from every battery reading
    /// before threshold comparison.
    pub uvp_sense_offset_mv: u16,

    /// Bias targets clamp to plus/minus this window.
    pub bias_target_limit_mv: u16,
    /// Control-law updates are skipped below this battery level.
    pub bias_min_battery_mv: u16,

    /// Battery monitor cadence, in scheduler ticks (500 ms).
    pub battery_poll_ticks: u32,
    /// Sensor sampling cadence, in scheduler ticks (1 s).
    pub sensor_poll_ticks: u32,
    /// Bias control-loop cadence, in scheduler ticks (500 ms).
    pub bias_update_ticks: u32,

    /// ADC setup for the battery rail path.
    pub battery_sampling: SamplingConfig,
    /// ADC setup for the external sense pad.
    pub sensor_sampling: SamplingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            uvp_shutdown_mv: 1800,
            uvp_restart_mv: 1875,
            uvp_sense_offset_mv: 0,
            bias_target_limit_mv: 1000,
            bias_min_battery_mv: 100,
            battery_poll_ticks: 50,
            sensor_poll_ticks: 100,
            bias_update_ticks: 50,
            battery_sampling: SamplingConfig::battery(),
            sensor_sampling: SamplingConfig::sensor(),
        }
    }
}

impl NodeConfig {
    /// Cross-field sanity checks, run once at startup before any
    /// subsystem is constructed.
    pub fn validate(&self) -> Result<(), Error> {
        if self.uvp_restart_mv <= self.uvp_shutdown_mv {
            return Err(Error::Config("restart threshold must exceed shutdown threshold"));
        }
        if self.uvp_shutdown_mv == 0 {
            return Err(Error::Config("shutdown threshold must be nonzero"));
        }
        if self.bias_min_battery_mv == 0 {
            return Err(Error::Config("minimum battery guard must be nonzero"));
        }
        if self.battery_poll_ticks == 0 || self.sensor_poll_ticks == 0 || self.bias_update_ticks == 0
        {
            return Err(Error::Config("poll cadences must be nonzero"));
        }
        Ok(())
    }
}
