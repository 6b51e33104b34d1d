//! Write/read dispatch over the attribute table.
//!
//! Pure decoding: a write payload either parses into an [`AttWrite`]
//! command or is rejected, and nothing here mutates state. The
//! contract, checked in this order by the caller and this module:
//!
//! 1. interlock asserted — the service drops the write before parsing;
//! 2. wrong payload length — dropped here;
//! 3. out-of-enum field — dropped here;
//! 4. out-of-range but well-typed numerics — passed through, the
//!    applying layer clamps them.

use heapless::Vec;

use crate::att::handles::{
    self, AttHandle, CCCD_LEN, PWM_BIAS_LEN, PWM_DUTY_OFFSET_LEN, PWM_FREQ_LEN, PWM_STATE_LEN,
};
use crate::error::{AttStatus, WriteReject};
use crate::sensors::Measurement;

/// A decoded, not-yet-applied write command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttWrite {
    /// Sensor voltage CCCD value, little-endian as received.
    SensorCccd(u16),
    /// Battery voltage CCCD value.
    BatteryCccd(u16),
    /// Timer clock reprogramming. Divider is pre-clamp.
    PwmFrequency {
        clk_div: crate::control::ClockDiv,
        clk_src: crate::control::ClockSource,
        pwm_divider: u16,
    },
    /// Manual duty path, percentages pre-clamp.
    PwmDutyOffset { dc2: u8, off2: u8, dc3: u8, off3: u8 },
    /// Closed-loop setpoints per channel: `(target_mv, offset_percent)`,
    /// target already folded as `vbias - zerocal`, pre-clamp.
    PwmBias { channels: [(i32, u8); 2] },
    /// Output state request.
    PwmState(bool),
}

fn expect_len(payload: &[u8], expected: usize) -> Result<(), WriteReject> {
    if payload.len() == expected {
        Ok(())
    } else {
        Err(WriteReject::BadLength {
            got: payload.len(),
            expected,
        })
    }
}

fn u16_le(payload: &[u8]) -> u16 {
    u16::from_le_bytes([payload[0], payload[1]])
}

fn i16_be(payload: &[u8]) -> i16 {
    i16::from_be_bytes([payload[0], payload[1]])
}

/// Decode a write against the table.
pub fn parse_write(handle: AttHandle, payload: &[u8]) -> Result<AttWrite, WriteReject> {
    match handle {
        AttHandle::SensorVoltageCfg => {
            expect_len(payload, CCCD_LEN)?;
            Ok(AttWrite::SensorCccd(u16_le(payload)))
        }
        AttHandle::BatteryVoltageCfg => {
            expect_len(payload, CCCD_LEN)?;
            Ok(AttWrite::BatteryCccd(u16_le(payload)))
        }
        AttHandle::PwmFreqVal => {
            expect_len(payload, PWM_FREQ_LEN)?;
            let clk_div =
                crate::control::ClockDiv::try_from_raw(payload[0]).ok_or(WriteReject::BadValue)?;
            let clk_src = crate::control::ClockSource::try_from_raw(payload[1])
                .ok_or(WriteReject::BadValue)?;
            let pwm_divider = u16::from_be_bytes([payload[2], payload[3]]);
            Ok(AttWrite::PwmFrequency {
                clk_div,
                clk_src,
                pwm_divider,
            })
        }
        AttHandle::PwmDutyOffsetVal => {
            expect_len(payload, PWM_DUTY_OFFSET_LEN)?;
            Ok(AttWrite::PwmDutyOffset {
                dc2: payload[0],
                off2: payload[1],
                dc3: payload[2],
                off3: payload[3],
            })
        }
        AttHandle::PwmBiasVal => {
            expect_len(payload, PWM_BIAS_LEN)?;
            // Per channel: vbias, zerocal (both signed 16-bit BE), then
            // the offset percentage. Folding happens here so the
            // applying layer sees one signed target.
            let mut channels = [(0i32, 0u8); 2];
            for (i, chunk) in payload.chunks_exact(5).enumerate() {
                let vbias = i32::from(i16_be(&chunk[0..2]));
                let zerocal = i32::from(i16_be(&chunk[2..4]));
                channels[i] = (vbias - zerocal, chunk[4]);
            }
            Ok(AttWrite::PwmBias { channels })
        }
        AttHandle::PwmStateVal => {
            expect_len(payload, PWM_STATE_LEN)?;
            match payload[0] {
                0 => Ok(AttWrite::PwmState(false)),
                1 => Ok(AttWrite::PwmState(true)),
                _ => Err(WriteReject::BadValue),
            }
        }
        _ => Err(WriteReject::UnknownHandle),
    }
}

/// A completed read: status byte plus up to one voltage value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub status: AttStatus,
    pub value: Vec<u8, { handles::VOLTAGE_VALUE_LEN }>,
}

impl ReadResponse {
    fn ok_mv(millivolts: u16) -> Self {
        let mut value = Vec::new();
        let _ = value.extend_from_slice(&millivolts.to_le_bytes());
        Self {
            status: AttStatus::Ok,
            value,
        }
    }

    fn app_error() -> Self {
        Self {
            status: AttStatus::AppError,
            value: Vec::new(),
        }
    }
}

/// Answer a read from the cached last measurements. Reads never
/// consult the interlock: a shut-down node still reports its battery.
pub fn read_response(raw_handle: u16, sensor: Measurement, battery: Measurement) -> ReadResponse {
    match AttHandle::from_raw(raw_handle) {
        Some(AttHandle::SensorVoltageVal) => ReadResponse::ok_mv(sensor.millivolts),
        Some(AttHandle::BatteryVoltageVal) => ReadResponse::ok_mv(battery.millivolts),
        _ => ReadResponse::app_error(),
    }
}
