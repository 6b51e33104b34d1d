//! Integration tests: NodeService → scheduler → controller → adapter.
//!
//! The whole control core is driven through its public stimuli (base
//! ticks, attribute writes/reads, link callbacks) against the host
//! register bank, exactly as the main loop drives it on target.

#![cfg(not(target_os = "espidf"))]

use biasnode::adapters::HardwareAdapter;
use biasnode::app::events::NodeEvent;
use biasnode::app::ports::{EventSink, NotifySink, PwmPort};
use biasnode::app::NodeService;
use biasnode::att::handles::AttHandle;
use biasnode::config::NodeConfig;
use biasnode::control::Channel;
use biasnode::error::{AttStatus, WriteReject};
use biasnode::events::LinkEvent;
use biasnode::sensors::AdcInput;

// ── Mock sinks ────────────────────────────────────────────────

#[derive(Default)]
struct MockSink {
    notifications: Vec<(u16, Vec<u8>)>,
    confirms: Vec<u16>,
    reads: Vec<(u16, AttStatus, Vec<u8>)>,
}

impl NotifySink for MockSink {
    fn notify(&mut self, handle: u16, payload: &[u8]) {
        self.notifications.push((handle, payload.to_vec()));
    }

    fn confirm_event(&mut self, handle: u16) {
        self.confirms.push(handle);
    }

    fn read_confirm(&mut self, handle: u16, status: AttStatus, value: &[u8]) {
        self.reads.push((handle, status, value.to_vec()));
    }
}

#[derive(Default)]
struct MockEvents {
    emitted: Vec<NodeEvent>,
}

impl EventSink for MockEvents {
    fn emit(&mut self, event: &NodeEvent) {
        self.emitted.push(*event);
    }
}

// ── Harness ───────────────────────────────────────────────────

struct Harness {
    service: NodeService,
    hw: HardwareAdapter,
    sink: MockSink,
    events: MockEvents,
}

impl Harness {
    fn new() -> Self {
        let mut hw = HardwareAdapter::new();
        // ~3.0 V battery at default sampling (X4 attenuation, 7x
        // oversampling, 16-bit resolution): raw 54613 -> 2999 mV.
        hw.sim_set_adc_raw(AdcInput::VbatHigh, 54613);
        let mut h = Self {
            service: NodeService::new(NodeConfig::default()).unwrap(),
            hw,
            sink: MockSink::default(),
            events: MockEvents::default(),
        };
        h.service.start(&mut h.hw, &mut h.events);
        h
    }

    fn ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.service
                .tick(&mut self.hw, &mut self.sink, &mut self.events);
        }
    }

    fn write(&mut self, handle: AttHandle, payload: &[u8]) -> Result<(), WriteReject> {
        self.service
            .handle_write(handle.raw(), payload, &mut self.hw, &mut self.events)
    }

    /// Raw battery code for a target millivolt value at the default
    /// sampling setup (3600 mV full scale, 16-bit).
    fn battery_raw(mv: u32) -> u16 {
        ((mv << 16) / 3600 + 1) as u16
    }

    fn set_battery_mv(&mut self, mv: u32) {
        self.hw
            .sim_set_adc_raw(AdcInput::VbatHigh, Self::battery_raw(mv));
    }
}

const BATTERY_PERIOD: u32 = 50;
const SENSOR_PERIOD: u32 = 100;

// ── Subscription and notification flow ────────────────────────

#[test]
fn battery_monitor_runs_and_caches_without_a_session() {
    let mut h = Harness::new();
    h.ticks(BATTERY_PERIOD);
    assert!(h.service.battery().millivolts >= 2990);
    assert!(h.service.battery().millivolts <= 3010);
    // No session, no subscription: nothing pushed.
    assert!(h.sink.notifications.is_empty());
}

#[test]
fn sensor_subscription_schedules_sampling_and_notifies() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.hw.sim_set_adc_raw(AdcInput::SensorPad, 21845); // ~1200 mV

    h.write(AttHandle::SensorVoltageCfg, &[0x01, 0x00]).unwrap();
    assert!(h.service.sensor_sampling_armed());

    h.ticks(SENSOR_PERIOD);
    let (handle, payload) = h.sink.notifications.last().unwrap();
    assert_eq!(*handle, AttHandle::SensorVoltageVal.raw());
    let mv = u16::from_le_bytes([payload[0], payload[1]]);
    assert!((1195..=1205).contains(&mv));

    // The cycle re-armed itself.
    assert!(h.service.sensor_sampling_armed());
}

#[test]
fn unsubscribe_stops_the_sampling_schedule() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.write(AttHandle::SensorVoltageCfg, &[0x01, 0x00]).unwrap();
    h.write(AttHandle::SensorVoltageCfg, &[0x00, 0x00]).unwrap();
    assert!(!h.service.sensor_sampling_armed());

    h.ticks(SENSOR_PERIOD * 2);
    assert!(h.sink.notifications.is_empty());
}

#[test]
fn battery_subscription_only_stores_until_the_monitor_fires() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.write(AttHandle::BatteryVoltageCfg, &[0x01, 0x00]).unwrap();
    assert!(h.sink.notifications.is_empty());

    h.ticks(BATTERY_PERIOD);
    let (handle, _) = h.sink.notifications.last().unwrap();
    assert_eq!(*handle, AttHandle::BatteryVoltageVal.raw());
}

// ── Undervoltage interlock scenario ───────────────────────────

#[test]
fn undervoltage_dip_locks_out_writes_until_recovery() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.write(AttHandle::SensorVoltageCfg, &[0x01, 0x00]).unwrap();
    h.write(AttHandle::PwmStateVal, &[1]).unwrap();
    assert!(h.service.output_enabled());
    assert!(h.hw.sleep_blocked());

    // Battery dips below 1800 mV.
    h.set_battery_mv(1750);
    h.ticks(BATTERY_PERIOD);
    assert!(h.service.interlock());
    assert!(!h.service.output_enabled());
    assert!(!h.service.sensor_sampling_armed());
    assert!(!h.hw.rail_enabled());
    assert!(!h.hw.sleep_blocked());
    assert!(h
        .events
        .emitted
        .iter()
        .any(|e| matches!(e, NodeEvent::InterlockAsserted { .. })));

    // Every write is now dropped, whatever the target.
    assert_eq!(
        h.write(AttHandle::PwmStateVal, &[1]),
        Err(WriteReject::InterlockAsserted)
    );
    assert_eq!(
        h.write(AttHandle::SensorVoltageCfg, &[0x01, 0x00]),
        Err(WriteReject::InterlockAsserted)
    );
    assert!(!h.service.output_enabled());

    // Recovery into the hysteresis band is not enough.
    h.set_battery_mv(1850);
    h.ticks(BATTERY_PERIOD);
    assert!(h.service.interlock());

    // At the restart threshold the latch clears and writes apply again.
    h.set_battery_mv(1900);
    h.ticks(BATTERY_PERIOD);
    assert!(!h.service.interlock());
    assert!(h.hw.rail_enabled());
    h.write(AttHandle::PwmStateVal, &[1]).unwrap();
    assert!(h.service.output_enabled());
}

#[test]
fn reads_still_answer_while_shut_down() {
    let mut h = Harness::new();
    h.set_battery_mv(1700);
    h.ticks(BATTERY_PERIOD);
    assert!(h.service.interlock());

    let response = h.service.handle_read(AttHandle::BatteryVoltageVal.raw());
    assert_eq!(response.status, AttStatus::Ok);
    let mv = u16::from_le_bytes([response.value[0], response.value[1]]);
    assert!((1695..=1705).contains(&mv));
}

// ── PWM attribute round trips ─────────────────────────────────

#[test]
fn duty_offset_write_reads_back_from_the_registers() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.hw.set_period_reg(999);

    h.write(AttHandle::PwmDutyOffsetVal, &[50, 0, 25, 0]).unwrap();
    assert_eq!(h.hw.compare(Channel::Pwm2), 500);
    assert_eq!(h.hw.phase_offset(Channel::Pwm2), 0);
    assert_eq!(h.hw.compare(Channel::Pwm3), 250);
    assert_eq!(h.hw.phase_offset(Channel::Pwm3), 0);
}

#[test]
fn malformed_frequency_write_changes_nothing() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    let before = h.hw.period_reg();

    assert_eq!(
        h.write(AttHandle::PwmFreqVal, &[0x00, 0x01, 0x01]),
        Err(WriteReject::BadLength {
            got: 3,
            expected: 4
        })
    );
    assert_eq!(h.hw.period_reg(), before);
    assert!(h
        .events
        .emitted
        .iter()
        .any(|e| matches!(e, NodeEvent::WriteRejected { .. })));
}

#[test]
fn oversized_bias_write_is_dropped_whole() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.hw.set_period_reg(999);
    let before = h.hw.compare(Channel::Pwm2);

    // 14 bytes against the 10-byte bias characteristic. The transport
    // constructor refuses to queue it at all...
    let long = [0x01, 0xF4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    assert!(LinkEvent::write(AttHandle::PwmBiasVal.raw(), &long).is_none());

    // ...and the dispatcher rejects it by length even if it arrived.
    assert_eq!(
        h.write(AttHandle::PwmBiasVal, &long),
        Err(WriteReject::BadLength {
            got: 14,
            expected: 10
        })
    );
    assert_eq!(h.hw.compare(Channel::Pwm2), before);
    h.write(AttHandle::PwmStateVal, &[1]).unwrap();
    h.ticks(BATTERY_PERIOD);
    // No target leaked in: both channels still run centered.
    assert_eq!(h.hw.compare(Channel::Pwm2), 500);
}

#[test]
fn frequency_write_reprograms_the_shared_period() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    // System clock / div 1, divider 500.
    h.write(AttHandle::PwmFreqVal, &[0x00, 0x01, 0x01, 0xF4])
        .unwrap();
    assert_eq!(h.hw.period_reg(), 499);
}

#[test]
fn bias_write_drives_the_control_loop() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.hw.set_period_reg(999);
    h.set_battery_mv(3500);
    h.ticks(BATTERY_PERIOD); // cache the battery measurement

    // ch2: vbias 500, zerocal 0, offset 0; ch3 zeros.
    h.write(
        AttHandle::PwmBiasVal,
        &[0x01, 0xF4, 0x00, 0x00, 0, 0x00, 0x00, 0x00, 0x00, 0],
    )
    .unwrap();
    h.write(AttHandle::PwmStateVal, &[1]).unwrap();

    h.ticks(BATTERY_PERIOD); // bias update fires
    // pulse = 500 - (5*500*1000)/(7*3500) = 500 - 102 = 398.
    assert_eq!(h.hw.compare(Channel::Pwm2), 398);
    // Zero target centers the other channel.
    assert_eq!(h.hw.compare(Channel::Pwm3), 500);
}

#[test]
fn disable_is_idempotent_and_stops_the_loop() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.write(AttHandle::PwmStateVal, &[1]).unwrap();
    h.write(AttHandle::PwmStateVal, &[0]).unwrap();
    h.write(AttHandle::PwmStateVal, &[0]).unwrap();
    assert!(!h.service.output_enabled());
    let enabled_events = h
        .events
        .emitted
        .iter()
        .filter(|e| matches!(e, NodeEvent::OutputDisabled))
        .count();
    assert_eq!(enabled_events, 1);
}

// ── Session lifecycle ─────────────────────────────────────────

#[test]
fn disconnect_tears_down_output_and_subscriptions() {
    let mut h = Harness::new();
    h.service.on_session_opened(&mut h.events);
    h.write(AttHandle::SensorVoltageCfg, &[0x01, 0x00]).unwrap();
    h.write(AttHandle::PwmStateVal, &[1]).unwrap();

    h.service.on_session_closed(&mut h.hw, &mut h.events);
    assert!(!h.service.output_enabled());
    assert!(!h.service.sensor_sampling_armed());

    // The battery monitor survives the disconnect.
    assert!(h.service.battery_monitor_armed());
    h.ticks(BATTERY_PERIOD);
    assert!(h.service.battery().millivolts > 0);
    // But nothing is pushed to a dead session.
    assert!(h
        .sink
        .notifications
        .iter()
        .all(|(handle, _)| *handle != AttHandle::SensorVoltageVal.raw()));
}

#[test]
fn event_indication_confirms_immediately() {
    let mut h = Harness::new();
    h.service.handle_event_indication(42, &mut h.sink);
    assert_eq!(h.sink.confirms, vec![42]);
}

#[test]
fn read_request_goes_through_the_sink() {
    let mut h = Harness::new();
    h.ticks(BATTERY_PERIOD);
    h.service
        .handle_read_request(AttHandle::BatteryVoltageVal.raw(), &mut h.sink);
    let (handle, status, value) = h.sink.reads.last().unwrap();
    assert_eq!(*handle, AttHandle::BatteryVoltageVal.raw());
    assert_eq!(*status, AttStatus::Ok);
    assert_eq!(value.len(), 2);

    h.service.handle_read_request(999, &mut h.sink);
    let (_, status, value) = h.sink.reads.last().unwrap();
    assert_eq!(*status, AttStatus::AppError);
    assert!(value.is_empty());
}
