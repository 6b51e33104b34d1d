//! Concrete hardware adapter.
//!
//! Implements every hardware-facing port over a shadow register bank.
//! On `target_os = "espidf"` each write is mirrored into the real
//! peripherals through [`crate::drivers::hw_init`]; on all other
//! targets the shadow bank *is* the hardware, which is what the host
//! test suite drives and inspects.

use crate::app::ports::{AdcPort, PowerPort, PwmPort};
use crate::control::Channel;
use crate::pins;
use crate::sensors::{AdcInput, SamplingConfig};

pub struct HardwareAdapter {
    period_reg: u16,
    phase_offset: [u16; 2],
    compare: [u16; 2],
    clock_enabled: bool,
    output_running: bool,
    sleep_blocked: bool,
    rail_enabled: bool,
    #[cfg(not(target_os = "espidf"))]
    adc_raw: [u16; 2],
}

impl HardwareAdapter {
    pub fn new() -> Self {
        Self {
            period_reg: pins::PWM_DEFAULT_DIV - 1,
            phase_offset: [0; 2],
            compare: [0; 2],
            clock_enabled: false,
            output_running: false,
            sleep_blocked: false,
            rail_enabled: false,
            #[cfg(not(target_os = "espidf"))]
            adc_raw: [0; 2],
        }
    }

    /// High-time of a channel in counts, derived from the compare and
    /// offset shadows. This is what the LEDC duty register wants.
    pub fn high_counts(&self, idx: usize) -> u16 {
        let period = u32::from(self.period_reg) + 1;
        let compare = u32::from(self.compare[idx]);
        let offset = u32::from(self.phase_offset[idx]);
        let high = if compare >= offset {
            compare - offset
        } else {
            compare + period - offset
        };
        high as u16
    }

    #[cfg(target_os = "espidf")]
    fn push_channel(&self, idx: usize) {
        let duty = if self.output_running {
            self.high_counts(idx)
        } else {
            0
        };
        crate::drivers::hw_init::ledc_set_compare(idx, duty, self.phase_offset[idx]);
    }

    #[cfg(not(target_os = "espidf"))]
    fn push_channel(&self, _idx: usize) {}
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── ADC ───────────────────────────────────────────────────────

impl AdcPort for HardwareAdapter {
    #[cfg(target_os = "espidf")]
    fn acquire_raw(&mut self, cfg: &SamplingConfig) -> u16 {
        let channel = match cfg.input {
            AdcInput::VbatHigh => crate::drivers::hw_init::BATTERY_ADC_CHANNEL,
            AdcInput::SensorPad => crate::drivers::hw_init::SENSE_ADC_CHANNEL,
        };
        crate::drivers::hw_init::adc_read(channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn acquire_raw(&mut self, cfg: &SamplingConfig) -> u16 {
        self.adc_raw[input_index(cfg.input)]
    }
}

#[cfg(not(target_os = "espidf"))]
fn input_index(input: AdcInput) -> usize {
    match input {
        AdcInput::VbatHigh => 0,
        AdcInput::SensorPad => 1,
    }
}

// ── PWM register bank ─────────────────────────────────────────

impl PwmPort for HardwareAdapter {
    fn period_reg(&self) -> u16 {
        self.period_reg
    }

    fn set_period_reg(&mut self, value: u16) {
        self.period_reg = value;
        #[cfg(target_os = "espidf")]
        {
            let divider = u32::from(value) + 1;
            crate::drivers::hw_init::ledc_set_frequency(16_000_000 / divider);
            for idx in 0..2 {
                self.push_channel(idx);
            }
        }
    }

    fn phase_offset(&self, ch: Channel) -> u16 {
        self.phase_offset[ch.index()]
    }

    fn set_phase_offset(&mut self, ch: Channel, count: u16) {
        self.phase_offset[ch.index()] = count;
        self.push_channel(ch.index());
    }

    fn compare(&self, ch: Channel) -> u16 {
        self.compare[ch.index()]
    }

    fn set_compare(&mut self, ch: Channel, count: u16) {
        self.compare[ch.index()] = count;
        self.push_channel(ch.index());
    }

    fn set_clock_enabled(&mut self, on: bool) {
        self.clock_enabled = on;
        #[cfg(target_os = "espidf")]
        crate::drivers::hw_init::ledc_set_running(on);
    }

    fn set_output_running(&mut self, on: bool) {
        self.output_running = on;
        for idx in 0..2 {
            self.push_channel(idx);
        }
    }
}

// ── Power management ──────────────────────────────────────────

impl PowerPort for HardwareAdapter {
    fn forbid_sleep(&mut self) {
        if !self.sleep_blocked {
            self.sleep_blocked = true;
            #[cfg(target_os = "espidf")]
            crate::drivers::hw_init::pm_lock_acquire();
        }
    }

    fn allow_sleep(&mut self) {
        if self.sleep_blocked {
            self.sleep_blocked = false;
            #[cfg(target_os = "espidf")]
            crate::drivers::hw_init::pm_lock_release();
        }
    }

    fn set_rail_enabled(&mut self, on: bool) {
        self.rail_enabled = on;
        #[cfg(target_os = "espidf")]
        crate::drivers::hw_init::gpio_write(pins::UVP_ENABLE_GPIO, on);
    }
}

// ── Simulation controls and probes ────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl HardwareAdapter {
    /// Set what the next acquisition on `input` returns.
    pub fn sim_set_adc_raw(&mut self, input: AdcInput, raw: u16) {
        self.adc_raw[input_index(input)] = raw;
    }

    pub fn sleep_blocked(&self) -> bool {
        self.sleep_blocked
    }

    pub fn rail_enabled(&self) -> bool {
        self.rail_enabled
    }

    pub fn clock_enabled(&self) -> bool {
        self.clock_enabled
    }

    pub fn output_running(&self) -> bool {
        self.output_running
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::sensors::Attenuation;

    fn cfg(input: AdcInput) -> SamplingConfig {
        SamplingConfig {
            input,
            sample_time_mult: 1,
            continuous: false,
            interval_mult: 0,
            attenuation: Attenuation::X4,
            chopping: false,
            oversampling: 0,
        }
    }

    #[test]
    fn adc_paths_are_independent() {
        let mut hw = HardwareAdapter::new();
        hw.sim_set_adc_raw(AdcInput::VbatHigh, 800);
        hw.sim_set_adc_raw(AdcInput::SensorPad, 300);
        assert_eq!(hw.acquire_raw(&cfg(AdcInput::VbatHigh)), 800);
        assert_eq!(hw.acquire_raw(&cfg(AdcInput::SensorPad)), 300);
    }

    #[test]
    fn register_bank_round_trips() {
        let mut hw = HardwareAdapter::new();
        hw.set_period_reg(499);
        hw.set_phase_offset(Channel::Pwm3, 125);
        hw.set_compare(Channel::Pwm3, 400);
        assert_eq!(hw.period_reg(), 499);
        assert_eq!(hw.phase_offset(Channel::Pwm3), 125);
        assert_eq!(hw.compare(Channel::Pwm3), 400);
        assert_eq!(hw.phase_offset(Channel::Pwm2), 0);
    }

    #[test]
    fn high_counts_wraps_with_the_offset() {
        let mut hw = HardwareAdapter::new();
        hw.set_period_reg(999);
        hw.set_phase_offset(Channel::Pwm2, 800);
        hw.set_compare(Channel::Pwm2, 300);
        // 300 + 1000 - 800
        assert_eq!(hw.high_counts(0), 500);
    }

    #[test]
    fn sleep_hold_is_level_triggered() {
        let mut hw = HardwareAdapter::new();
        hw.forbid_sleep();
        hw.forbid_sleep();
        assert!(hw.sleep_blocked());
        hw.allow_sleep();
        assert!(!hw.sleep_blocked());
    }
}
