//! GPIO / peripheral pin assignments for the BiasNode main board.
//!
//! Single source of truth — every driver references this module rather
//! than hard-coding pin numbers. Change a pin here and it propagates
//! everywhere.

// ---------------------------------------------------------------------------
// Bias output stage (timer PWM channels)
// ---------------------------------------------------------------------------

/// PWM channel 2 output — bias rail A driver.
pub const BIAS_PWM2_GPIO: i32 = 8;
/// PWM channel 3 output — bias rail B driver.
pub const BIAS_PWM3_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Battery / sensor analog front end
// ---------------------------------------------------------------------------

/// Battery rail tap (internal high divider input on the ADC mux).
pub const VBAT_ADC_GPIO: i32 = -1; // internal channel, no external pad
/// External sense pad routed to the ADC mux.
pub const SENSE_ADC_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Undervoltage protection support hardware
// ---------------------------------------------------------------------------

/// Digital output: enables the sense amplifier rail (active HIGH).
/// Driven LOW while the undervoltage interlock is asserted.
pub const UVP_ENABLE_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// Power-on timer divider (period register = divider - 1).
pub const PWM_DEFAULT_DIV: u16 = 500;
/// Power-on input clock prescaler exponent (divide by 1).
pub const PWM_DEFAULT_CLK_DIV: u8 = 0;
