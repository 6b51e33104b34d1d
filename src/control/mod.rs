//! Bias output control: PWM channel identities, clock tree types, and
//! the closed-loop controller in [`bias`].

pub mod bias;

pub use bias::BiasController;

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// A bias output channel. Both channels share one timer clock and
/// period register; only the compare and phase-offset registers are
/// per-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Pwm2,
    Pwm3,
}

impl Channel {
    pub const ALL: [Self; 2] = [Self::Pwm2, Self::Pwm3];

    /// Dense index for per-channel storage arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Pwm2 => 0,
            Self::Pwm3 => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Timer clock tree
// ---------------------------------------------------------------------------

/// Input clock prescaler. The hardware divides by `1 << exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockDiv {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
}

impl ClockDiv {
    /// Decode a raw wire byte. Values above `Div8` are illegal.
    pub fn try_from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Div1),
            1 => Some(Self::Div2),
            2 => Some(Self::Div4),
            3 => Some(Self::Div8),
            _ => None,
        }
    }

    pub fn factor(self) -> u32 {
        1 << (self as u32)
    }
}

/// Timer input clock selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockSource {
    /// 32 kHz low-power oscillator.
    LowPower = 0,
    /// 16 MHz system clock.
    System = 1,
}

impl ClockSource {
    pub fn try_from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::LowPower),
            1 => Some(Self::System),
            _ => None,
        }
    }

    pub fn freq_hz(self) -> u32 {
        match self {
            Self::LowPower => 32_000,
            Self::System => 16_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_div_decodes_legal_range_only() {
        assert_eq!(ClockDiv::try_from_raw(0), Some(ClockDiv::Div1));
        assert_eq!(ClockDiv::try_from_raw(3), Some(ClockDiv::Div8));
        assert_eq!(ClockDiv::try_from_raw(4), None);
        assert_eq!(ClockDiv::try_from_raw(255), None);
    }

    #[test]
    fn clock_source_frequencies() {
        assert_eq!(ClockSource::LowPower.freq_hz(), 32_000);
        assert_eq!(ClockSource::System.freq_hz(), 16_000_000);
        assert_eq!(ClockSource::try_from_raw(2), None);
    }

    #[test]
    fn div_factor_is_power_of_two() {
        assert_eq!(ClockDiv::Div1.factor(), 1);
        assert_eq!(ClockDiv::Div8.factor(), 8);
    }
}
