//! One-shot hardware peripheral initialization and raw accessors.
//!
//! Configures the ADC unit, the sense-rail GPIO, the LEDC timer
//! backing both bias channels, and the power-management lock, using
//! raw ESP-IDF sys calls. Called once from `main()` before the event
//! loop starts. On non-espidf targets every accessor is a simulation
//! stub; the host adapter keeps its own register bank instead.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed,
    PmLockFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed => write!(f, "LEDC timer/channel config failed"),
            Self::PmLockFailed(rc) => write!(f, "PM lock create failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the event loop;
    // single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
        init_ledc();
        init_pm_lock()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: written once during `init_adc()` before the event loop;
/// read only from the single-threaded main-loop ADC path afterwards.
#[cfg(target_os = "espidf")]
unsafe fn adc_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for channel in [BATTERY_ADC_CHANNEL, SENSE_ADC_CHANNEL] {
        let ret = unsafe { adc_oneshot_config_channel(adc_handle(), channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcInitFailed(ret));
        }
    }

    info!("hw_init: ADC configured (battery + sense pad)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub const BATTERY_ADC_CHANNEL: u32 = adc_channel_t_ADC_CHANNEL_0;
#[cfg(target_os = "espidf")]
pub const SENSE_ADC_CHANNEL: u32 = adc_channel_t_ADC_CHANNEL_6;

#[cfg(target_os = "espidf")]
pub fn adc_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc_handle() contract — single-threaded main-loop access
    // only, after init_adc() completed.
    let ret = unsafe { adc_oneshot_read(adc_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read(_channel: u32) -> u16 {
    0
}

// ── GPIO outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::UVP_ENABLE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    unsafe { gpio_set_level(pins::UVP_ENABLE_GPIO, 0) };

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: writes to an already-configured output pin; main-loop
    // only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── LEDC PWM (bias output stage) ──────────────────────────────

/// Counter resolution backing the bias timer. 14 bits covers the full
/// divider range after clamping.
#[cfg(target_os = "espidf")]
const BIAS_TIMER_BITS: u32 = 14;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() {
    // SAFETY: called from the single main-task context via
    // init_peripherals().
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: BIAS_TIMER_BITS,
        freq_hz: 16_000_000 / u32::from(pins::PWM_DEFAULT_DIV),
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    unsafe {
        ledc_timer_config(&timer);
    }

    for (channel, gpio) in [
        (ledc_channel_t_LEDC_CHANNEL_0, pins::BIAS_PWM2_GPIO),
        (ledc_channel_t_LEDC_CHANNEL_1, pins::BIAS_PWM3_GPIO),
    ] {
        unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: ledc_timer_t_LEDC_TIMER_0,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            });
        }
    }

    info!("hw_init: LEDC bias timer configured");
}

/// Program a channel's compare point and phase offset. `duty` maps to
/// the end-of-active-cycle count, `hpoint` to the phase offset.
#[cfg(target_os = "espidf")]
pub fn ledc_set_compare(channel_index: usize, duty: u16, hpoint: u16) {
    let channel = if channel_index == 0 {
        ledc_channel_t_LEDC_CHANNEL_0
    } else {
        ledc_channel_t_LEDC_CHANNEL_1
    };
    // SAFETY: channel configured during init_ledc(); main-loop only.
    unsafe {
        ledc_set_duty_with_hpoint(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            u32::from(duty),
            u32::from(hpoint),
        );
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_compare(_channel_index: usize, _duty: u16, _hpoint: u16) {}

/// Retune the shared timer to a new output frequency.
#[cfg(target_os = "espidf")]
pub fn ledc_set_frequency(freq_hz: u32) {
    // SAFETY: timer configured during init_ledc(); main-loop only.
    unsafe {
        ledc_set_freq(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            ledc_timer_t_LEDC_TIMER_0,
            freq_hz.max(1),
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_frequency(_freq_hz: u32) {}

/// Gate the shared timer clock.
#[cfg(target_os = "espidf")]
pub fn ledc_set_running(on: bool) {
    // SAFETY: timer configured during init_ledc(); main-loop only.
    unsafe {
        if on {
            ledc_timer_resume(ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_timer_t_LEDC_TIMER_0);
        } else {
            ledc_timer_pause(ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_timer_t_LEDC_TIMER_0);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_running(_on: bool) {}

// ── Power-management lock ─────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut PM_LOCK: esp_pm_lock_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_pm_lock() -> Result<(), HwInitError> {
    // SAFETY: PM_LOCK is only written here, once at boot.
    let ret = unsafe {
        esp_pm_lock_create(
            esp_pm_lock_type_t_ESP_PM_NO_LIGHT_SLEEP,
            0,
            c"bias_output".as_ptr(),
            &raw mut PM_LOCK,
        )
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::PmLockFailed(ret));
    }
    Ok(())
}

/// Hold the device out of light sleep while the output stage runs.
#[cfg(target_os = "espidf")]
pub fn pm_lock_acquire() {
    // SAFETY: PM_LOCK created during init_pm_lock(); main-loop only.
    unsafe {
        esp_pm_lock_acquire(PM_LOCK);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn pm_lock_acquire() {}

#[cfg(target_os = "espidf")]
pub fn pm_lock_release() {
    // SAFETY: PM_LOCK created during init_pm_lock(); main-loop only.
    unsafe {
        esp_pm_lock_release(PM_LOCK);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn pm_lock_release() {}
