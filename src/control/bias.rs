//! Closed-loop PWM bias controller.
//!
//! Each output channel holds a signed millivolt target. Every control
//! cycle the controller re-derives the channel's duty cycle from the
//! latest battery reading, so the delivered bias stays constant as the
//! battery sags:
//!
//! ```text
//!   pulse_width = period/2 - (5 * target_mv * period) / (7 * battery_mv)
//! ```
//!
//! The 5/7 factor and the halving are fixed properties of the output
//! stage divider network. `pulse_width` is clamped to `[0, period]`,
//! then shifted by the channel's phase offset with single-wrap modulo
//! before landing in the compare register.
//!
//! Both channels are ganged on one timer: they share the input clock,
//! prescaler, and period register, so enable/disable acts on the pair.

use log::{info, warn};

use crate::app::ports::{PowerPort, PwmPort};
use crate::control::{Channel, ClockDiv, ClockSource};

/// `pwm_divider` legal range after clamping.
const PWM_DIV_MIN: u16 = 2;
const PWM_DIV_MAX: u16 = 16383;

/// Per-channel bias setpoint, written by the attribute layer and read
/// by the periodic update.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelBias {
    pub target_mv: i16,
    pub offset_percent: u8,
}

/// Wrap `pulse + offset` into `[0, period)`.
///
/// Both inputs are bounded by `period`, so this is at most a single
/// wrap (the modulo also covers the corner where both sit exactly at
/// the period). A zero `period` maps to compare 0: the dispatcher's
/// divider clamp never produces one, but a period register at
/// `u16::MAX` truncates to it here.
pub fn wrap_end_cycle(pulse_width: u16, phase_offset: u16, period: u16) -> u16 {
    if period == 0 {
        return 0;
    }
    let end = u32::from(pulse_width) + u32::from(phase_offset);
    (end % u32::from(period)) as u16
}

/// The controller. Owns setpoints and the enabled flag; all hardware
/// access goes through the [`PwmPort`] passed into each method, so the
/// control law runs unchanged against the host simulator.
pub struct BiasController {
    channels: [ChannelBias; 2],
    enabled: bool,
    clk_div: ClockDiv,
    clk_src: ClockSource,
    target_limit_mv: i32,
    min_battery_mv: u16,
}

impl BiasController {
    pub fn new(target_limit_mv: u16, min_battery_mv: u16) -> Self {
        Self {
            channels: [ChannelBias::default(); 2],
            enabled: false,
            clk_div: ClockDiv::Div1,
            clk_src: ClockSource::System,
            target_limit_mv: i32::from(target_limit_mv),
            min_battery_mv,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn channel(&self, ch: Channel) -> ChannelBias {
        self.channels[ch.index()]
    }

    /// Store a new bias target, clamped to the hardware-safe window.
    pub fn set_target(&mut self, ch: Channel, target_mv: i32) {
        let clamped = target_mv.clamp(-self.target_limit_mv, self.target_limit_mv);
        self.channels[ch.index()].target_mv = clamped as i16;
    }

    /// Store and immediately apply a phase offset, as a percentage of
    /// the period. Independent of the periodic control loop.
    pub fn set_offset(&mut self, ch: Channel, offset_percent: u8, pwm: &mut impl PwmPort) {
        let pct = offset_percent.min(100);
        self.channels[ch.index()].offset_percent = pct;
        let period = u32::from(pwm.period_reg()) + 1;
        let count = (period * u32::from(pct) / 100) as u16;
        pwm.set_phase_offset(ch, count);
    }

    /// Manual duty path: program a fixed duty cycle and phase offset,
    /// both as percentages, bypassing the closed loop.
    pub fn set_duty_and_offset(
        &mut self,
        ch: Channel,
        duty_percent: u8,
        offset_percent: u8,
        pwm: &mut impl PwmPort,
    ) {
        let duty = duty_percent.min(100);
        let period = u32::from(pwm.period_reg()) + 1;
        let compare = (period * u32::from(duty) / 100) as u16;
        pwm.set_compare(ch, compare);
        self.set_offset(ch, offset_percent, pwm);
    }

    /// Reprogram the shared timer clock tree.
    ///
    /// `pwm_divider` is clamped to `[2, 16383]`; illegal divider/source
    /// enum values never reach here, the dispatch layer drops them.
    pub fn set_frequency(
        &mut self,
        clk_div: ClockDiv,
        clk_src: ClockSource,
        pwm_divider: u16,
        pwm: &mut impl PwmPort,
    ) {
        let divider = pwm_divider.clamp(PWM_DIV_MIN, PWM_DIV_MAX);
        self.clk_div = clk_div;
        self.clk_src = clk_src;
        pwm.set_period_reg(divider - 1);

        let input_hz = clk_src.freq_hz() / clk_div.factor();
        info!(
            "PWM | clock {:?}/{:?} divider={} output={} Hz",
            clk_src,
            clk_div,
            divider,
            input_hz / u32::from(divider)
        );
    }

    /// One control cycle for one channel. Returns `true` when a new
    /// compare value was written, `false` when the cycle was skipped.
    pub fn update(&self, ch: Channel, battery_mv: u16, pwm: &mut impl PwmPort) -> bool {
        // Near-singular guard: a collapsed battery reading would blow
        // up the division. Prior register values persist.
        if battery_mv < self.min_battery_mv {
            warn!("PWM | battery {} mV too low, update skipped", battery_mv);
            return false;
        }

        let period = i32::from(pwm.period_reg()) + 1;
        let offset = pwm.phase_offset(ch);
        let target = i32::from(self.channels[ch.index()].target_mv);

        let pulse = period / 2 - (5 * target * period) / (7 * i32::from(battery_mv));
        let pulse = pulse.clamp(0, period) as u16;

        let end_cycle = wrap_end_cycle(pulse, offset, period as u16);
        pwm.set_compare(ch, end_cycle);
        log::debug!(
            "PWM | {:?} battery={} target={} pulse={} end={}",
            ch,
            battery_mv,
            target,
            pulse,
            end_cycle
        );
        true
    }

    /// Run the control cycle for every channel. No-op while disabled.
    pub fn update_all(&self, battery_mv: u16, pwm: &mut impl PwmPort) {
        if !self.enabled {
            return;
        }
        for ch in Channel::ALL {
            self.update(ch, battery_mv, pwm);
        }
    }

    /// Start the timer clock and hold the device out of sleep.
    /// Returns `true` when the state actually changed.
    pub fn enable<H: PwmPort + PowerPort>(&mut self, hw: &mut H) -> bool {
        if self.enabled {
            return false;
        }
        hw.forbid_sleep();
        hw.set_clock_enabled(true);
        hw.set_output_running(true);
        self.enabled = true;
        info!("PWM | output enabled");
        true
    }

    /// Stop the timer clock and release the sleep hold. Setpoints and
    /// hardware duty/offset registers are retained for re-enable.
    pub fn disable<H: PwmPort + PowerPort>(&mut self, hw: &mut H) -> bool {
        if !self.enabled {
            return false;
        }
        hw.set_output_running(false);
        hw.set_clock_enabled(false);
        hw.allow_sleep();
        self.enabled = false;
        info!("PWM | output disabled");
        true
    }
}
