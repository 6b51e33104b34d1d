//! Attribute handle table.
//!
//! The stack allocates attribute indices densely in declaration order,
//! so the enum discriminants here are the wire handles. The table is
//! immutable for the life of the process; handles outside it are
//! answered with an application error (reads) or dropped (writes).

/// Custom service UUID.
pub const SVC_UUID_128: u128 = 0xb421_c4f3_64ed_a599_4d12_ecde_e89f_0e72;
/// Sensor voltage characteristic UUID.
pub const SENSOR_VOLTAGE_UUID_128: u128 = 0x41d2_2c92_f648_4d61_9342_9d72_3208_0304;
/// Battery voltage characteristic UUID.
pub const BATTERY_VOLTAGE_UUID_128: u128 = 0x5be0_7d11_8c4a_4b02_a77d_2f31_90ce_6b1a;
/// PWM frequency configuration characteristic UUID.
pub const PWM_FREQ_UUID_128: u128 = 0x4a5a_6e52_4266_36ab_4db8_2b2c_5515_69c8;
/// PWM duty+offset configuration characteristic UUID.
pub const PWM_DUTY_OFFSET_UUID_128: u128 = 0x7c9e_02ad_15f4_4e88_b02c_8a6d_44e1_3357;
/// PWM bias+offset configuration characteristic UUID.
pub const PWM_BIAS_UUID_128: u128 = 0x93f1_4b60_ce27_4a19_8d5e_70bb_1fa8_02d4;
/// PWM output state characteristic UUID.
pub const PWM_STATE_UUID_128: u128 = 0xe60c_88a1_30d9_4f72_95ab_c144_7d2e_9b36;

/// Payload lengths, byte-exact.
pub const VOLTAGE_VALUE_LEN: usize = 2;
pub const CCCD_LEN: usize = 2;
pub const PWM_FREQ_LEN: usize = 4;
pub const PWM_DUTY_OFFSET_LEN: usize = 4;
pub const PWM_BIAS_LEN: usize = 10;
pub const PWM_STATE_LEN: usize = 1;

/// Largest write payload in the table.
pub const MAX_WRITE_LEN: usize = PWM_BIAS_LEN;

/// The service's attribute indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AttHandle {
    Svc = 0,

    SensorVoltageChar = 1,
    SensorVoltageVal = 2,
    SensorVoltageCfg = 3,
    SensorVoltageDesc = 4,

    BatteryVoltageChar = 5,
    BatteryVoltageVal = 6,
    BatteryVoltageCfg = 7,
    BatteryVoltageDesc = 8,

    PwmFreqChar = 9,
    PwmFreqVal = 10,
    PwmFreqDesc = 11,

    PwmDutyOffsetChar = 12,
    PwmDutyOffsetVal = 13,
    PwmDutyOffsetDesc = 14,

    PwmBiasChar = 15,
    PwmBiasVal = 16,
    PwmBiasDesc = 17,

    PwmStateChar = 18,
    PwmStateVal = 19,
    PwmStateDesc = 20,
}

impl AttHandle {
    /// Map a raw wire handle into the table.
    pub fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            0 => Self::Svc,
            1 => Self::SensorVoltageChar,
            2 => Self::SensorVoltageVal,
            3 => Self::SensorVoltageCfg,
            4 => Self::SensorVoltageDesc,
            5 => Self::BatteryVoltageChar,
            6 => Self::BatteryVoltageVal,
            7 => Self::BatteryVoltageCfg,
            8 => Self::BatteryVoltageDesc,
            9 => Self::PwmFreqChar,
            10 => Self::PwmFreqVal,
            11 => Self::PwmFreqDesc,
            12 => Self::PwmDutyOffsetChar,
            13 => Self::PwmDutyOffsetVal,
            14 => Self::PwmDutyOffsetDesc,
            15 => Self::PwmBiasChar,
            16 => Self::PwmBiasVal,
            17 => Self::PwmBiasDesc,
            18 => Self::PwmStateChar,
            19 => Self::PwmStateVal,
            20 => Self::PwmStateDesc,
            _ => return None,
        })
    }

    pub fn raw(self) -> u16 {
        self as u16
    }
}
