//! Analog front-end: ADC channel configuration and sample conversion.
//!
//! The node owns two measurement paths through one shared ADC mux:
//!
//! ```text
//!   battery rail ──► high divider ──┐
//!                                   ├──► SAR ADC ──► raw ──► millivolts
//!   sense pad ──────────────────────┘
//! ```
//!
//! Conversion is pure integer math so it is testable on the host with
//! no hardware behind it. The raw-to-millivolt formula tracks the
//! converter's effective resolution, which grows with oversampling:
//! each doubling of conversions adds one bit, saturating at 16 bits.

use serde::{Deserialize, Serialize};

use crate::app::ports::AdcPort;

// ---------------------------------------------------------------------------
// Channel selection and analog settings
// ---------------------------------------------------------------------------

/// ADC mux input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcInput {
    /// Battery rail through the internal high divider.
    VbatHigh,
    /// External sense pad.
    SensorPad,
}

/// Input attenuation setting. Each step widens the full-scale range by
/// one 900 mV reference unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Attenuation {
    /// Full scale 900 mV.
    None = 0,
    /// Full scale 1800 mV.
    X2 = 1,
    /// Full scale 2700 mV.
    X3 = 2,
    /// Full scale 3600 mV.
    X4 = 3,
}

impl Attenuation {
    /// Full-scale reference in millivolts for this attenuation step.
    pub fn reference_mv(self) -> u32 {
        900 * (self as u32 + 1)
    }
}

/// Complete per-channel acquisition setup, mirroring the converter's
/// control register fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Mux input to convert.
    pub input: AdcInput,
    /// Sample-and-hold time multiplier.
    pub sample_time_mult: u8,
    /// Continuous conversion mode (free-running) vs single shot.
    pub continuous: bool,
    /// Interval between continuous conversions, in timer units.
    pub interval_mult: u8,
    /// Input attenuation.
    pub attenuation: Attenuation,
    /// Chopper mode: average two conversions of opposite polarity to
    /// cancel internal offset.
    pub chopping: bool,
    /// Oversampling exponent: 2^n conversions are accumulated.
    /// Effective resolution saturates six steps above the native
    /// 10 bits.
    pub oversampling: u8,
}

impl SamplingConfig {
    /// Battery rail acquisition: single shot, chopped, 7x oversampled
    /// through the high divider.
    pub fn battery() -> Self {
        Self {
            input: AdcInput::VbatHigh,
            sample_time_mult: 15,
            continuous: false,
            interval_mult: 0,
            attenuation: Attenuation::X4,
            chopping: true,
            oversampling: 7,
        }
    }

    /// External sense pad acquisition.
    pub fn sensor() -> Self {
        Self {
            input: AdcInput::SensorPad,
            sample_time_mult: 15,
            continuous: false,
            interval_mult: 0,
            attenuation: Attenuation::X4,
            chopping: true,
            oversampling: 7,
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// One completed acquisition: the raw accumulator value and its
/// millivolt conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    pub raw: u16,
    pub millivolts: u16,
}

/// Effective converter resolution in bits for an oversampling exponent.
pub fn resolution_bits(oversampling: u8) -> u32 {
    10 + u32::from(oversampling.min(6))
}

/// Convert a raw accumulator value to millivolts.
///
/// `mv = raw * ref_mv >> resolution_bits`, computed in 32 bits so the
/// intermediate product cannot overflow (max 65535 * 3600 < 2^32).
pub fn sample_to_mv(raw: u16, attenuation: Attenuation, oversampling: u8) -> u16 {
    let scaled = u32::from(raw) * attenuation.reference_mv();
    (scaled >> resolution_bits(oversampling)) as u16
}

/// Run one acquisition on `adc` and convert the result.
pub fn acquire(adc: &mut impl AdcPort, cfg: &SamplingConfig) -> Measurement {
    let raw = adc.acquire_raw(cfg);
    Measurement {
        raw,
        millivolts: sample_to_mv(raw, cfg.attenuation, cfg.oversampling),
    }
}
