//! The node's orchestrator.
//!
//! `NodeService` owns every piece of retained state: the scheduler,
//! the undervoltage monitor, the bias controller, cached measurements,
//! and the subscription flags. It is driven from the outside by three
//! stimuli only:
//!
//! - `tick()` at the 10 ms base rate,
//! - `handle_write()` / `handle_read()` from the attribute transport,
//! - `on_session_opened()` / `on_session_closed()` link callbacks.
//!
//! All hardware goes through the port traits, so the whole struct runs
//! unmodified under host tests against the simulated adapter.

use log::debug;

use crate::att::dispatch::{self, AttWrite, ReadResponse};
use crate::att::handles::AttHandle;
use crate::att::notify::{self, CCCD_SUBSCRIBE};
use crate::config::NodeConfig;
use crate::control::{BiasController, Channel};
use crate::app::events::NodeEvent;
use crate::app::ports::{AdcPort, EventSink, NotifySink, PowerPort, PwmPort};
use crate::error::{Result, WriteReject};
use crate::safety::{UndervoltageMonitor, UvpTransition};
use crate::scheduler::{ScheduleHandle, Task, TickScheduler};
use crate::sensors::{self, Measurement};

pub struct NodeService {
    config: NodeConfig,
    scheduler: TickScheduler,
    monitor: UndervoltageMonitor,
    bias: BiasController,

    // Last-value-wins measurement cache, one slot per path.
    battery: Measurement,
    sensor: Measurement,

    sensor_cccd: u16,
    battery_cccd: u16,
    session_active: bool,

    monitor_handle: ScheduleHandle,
    sensor_handle: ScheduleHandle,
    bias_handle: ScheduleHandle,

    // The battery monitor is armed exactly once per boot.
    monitor_started: bool,
}

impl NodeService {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let monitor = UndervoltageMonitor::new(
            config.uvp_shutdown_mv,
            config.uvp_restart_mv,
            config.uvp_sense_offset_mv,
        );
        let bias = BiasController::new(config.bias_target_limit_mv, config.bias_min_battery_mv);
        Ok(Self {
            config,
            scheduler: TickScheduler::new(),
            monitor,
            bias,
            battery: Measurement::default(),
            sensor: Measurement::default(),
            sensor_cccd: 0,
            battery_cccd: 0,
            session_active: false,
            monitor_handle: ScheduleHandle::INVALID,
            sensor_handle: ScheduleHandle::INVALID,
            bias_handle: ScheduleHandle::INVALID,
            monitor_started: false,
        })
    }

    /// Arm the battery monitor and power the sense rail. Idempotent;
    /// the monitor runs for the rest of the process lifetime.
    pub fn start(&mut self, hw: &mut impl PowerPort, events: &mut impl EventSink) {
        if self.monitor_started {
            return;
        }
        self.monitor_started = true;
        hw.set_rail_enabled(true);
        self.monitor_handle = self
            .scheduler
            .schedule_after(self.config.battery_poll_ticks, Task::BatteryMonitor);
        events.emit(&NodeEvent::Started);
    }

    // -----------------------------------------------------------------
    // Periodic drive
    // -----------------------------------------------------------------

    /// Advance one base tick and run whatever fell due.
    pub fn tick<H>(
        &mut self,
        hw: &mut H,
        sink: &mut impl NotifySink,
        events: &mut impl EventSink,
    ) where
        H: AdcPort + PwmPort + PowerPort,
    {
        for task in self.scheduler.tick() {
            match task {
                Task::BatteryMonitor => self.battery_cycle(hw, sink, events),
                Task::SensorSample => self.sensor_cycle(hw, sink, events),
                Task::BiasUpdate => self.bias_cycle(hw),
            }
        }
    }

    fn battery_cycle<H>(
        &mut self,
        hw: &mut H,
        sink: &mut impl NotifySink,
        events: &mut impl EventSink,
    ) where
        H: AdcPort + PwmPort + PowerPort,
    {
        self.battery = sensors::acquire(hw, &self.config.battery_sampling);
        debug!(
            "BAT | raw={} mv={}",
            self.battery.raw, self.battery.millivolts
        );

        match self.monitor.evaluate(self.battery.millivolts) {
            UvpTransition::EnteredShutDown => {
                events.emit(&NodeEvent::InterlockAsserted {
                    battery_mv: self.battery.millivolts,
                });
                // Stop everything that produces output or burns power.
                self.scheduler.cancel(&mut self.sensor_handle);
                hw.set_rail_enabled(false);
                if self.bias.disable(hw) {
                    self.scheduler.cancel(&mut self.bias_handle);
                    events.emit(&NodeEvent::OutputDisabled);
                }
            }
            UvpTransition::EnteredNormal => {
                events.emit(&NodeEvent::InterlockCleared {
                    battery_mv: self.battery.millivolts,
                });
                hw.set_rail_enabled(true);
            }
            UvpTransition::None => {}
        }

        if notify::publish(
            sink,
            AttHandle::BatteryVoltageVal.raw(),
            self.battery,
            self.battery_cccd,
            self.session_active,
        ) {
            events.emit(&NodeEvent::NotificationSent {
                handle: AttHandle::BatteryVoltageVal.raw(),
            });
        }

        // The monitor re-arms unconditionally; it is the one activity
        // that must keep running while shut down.
        self.monitor_handle = self
            .scheduler
            .schedule_after(self.config.battery_poll_ticks, Task::BatteryMonitor);
    }

    fn sensor_cycle<H>(
        &mut self,
        hw: &mut H,
        sink: &mut impl NotifySink,
        events: &mut impl EventSink,
    ) where
        H: AdcPort + PwmPort + PowerPort,
    {
        self.sensor = sensors::acquire(hw, &self.config.sensor_sampling);
        debug!(
            "SENSE | raw={} mv={}",
            self.sensor.raw, self.sensor.millivolts
        );

        if notify::publish(
            sink,
            AttHandle::SensorVoltageVal.raw(),
            self.sensor,
            self.sensor_cccd,
            self.session_active,
        ) {
            events.emit(&NodeEvent::NotificationSent {
                handle: AttHandle::SensorVoltageVal.raw(),
            });
        }

        // Sampling keeps itself alive only while somebody is listening
        // and the interlock is clear.
        if self.session_active && self.sensor_cccd == CCCD_SUBSCRIBE && !self.monitor.interlock() {
            self.sensor_handle = self
                .scheduler
                .schedule_after(self.config.sensor_poll_ticks, Task::SensorSample);
        } else {
            self.sensor_handle = ScheduleHandle::INVALID;
        }
    }

    fn bias_cycle<H>(&mut self, hw: &mut H)
    where
        H: PwmPort + PowerPort,
    {
        self.bias.update_all(self.battery.millivolts, hw);
        if self.bias.is_enabled() {
            self.bias_handle = self
                .scheduler
                .schedule_after(self.config.bias_update_ticks, Task::BiasUpdate);
        } else {
            self.bias_handle = ScheduleHandle::INVALID;
        }
    }

    // -----------------------------------------------------------------
    // Attribute protocol entry points
    // -----------------------------------------------------------------

    /// Apply a peer write. The interlock gate runs before any parsing;
    /// a shut-down node mutates nothing, whatever the payload.
    pub fn handle_write<H>(
        &mut self,
        raw_handle: u16,
        payload: &[u8],
        hw: &mut H,
        events: &mut impl EventSink,
    ) -> core::result::Result<(), WriteReject>
    where
        H: PwmPort + PowerPort,
    {
        let result = self.try_apply_write(raw_handle, payload, hw, events);
        if let Err(reason) = result {
            events.emit(&NodeEvent::WriteRejected {
                handle: raw_handle,
                reason,
            });
        }
        result
    }

    fn try_apply_write<H>(
        &mut self,
        raw_handle: u16,
        payload: &[u8],
        hw: &mut H,
        events: &mut impl EventSink,
    ) -> core::result::Result<(), WriteReject>
    where
        H: PwmPort + PowerPort,
    {
        if self.monitor.interlock() {
            return Err(WriteReject::InterlockAsserted);
        }
        let handle = AttHandle::from_raw(raw_handle).ok_or(WriteReject::UnknownHandle)?;
        match dispatch::parse_write(handle, payload)? {
            AttWrite::SensorCccd(value) => {
                self.sensor_cccd = value;
                if value == CCCD_SUBSCRIBE {
                    if !self.sensor_handle.is_valid() && self.session_active {
                        self.sensor_handle = self
                            .scheduler
                            .schedule_after(self.config.sensor_poll_ticks, Task::SensorSample);
                    }
                } else {
                    self.scheduler.cancel(&mut self.sensor_handle);
                }
            }
            AttWrite::BatteryCccd(value) => {
                // Stored only; the battery monitor runs regardless and
                // its publisher re-checks this gate every cycle.
                self.battery_cccd = value;
            }
            AttWrite::PwmFrequency {
                clk_div,
                clk_src,
                pwm_divider,
            } => {
                self.bias.set_frequency(clk_div, clk_src, pwm_divider, hw);
            }
            AttWrite::PwmDutyOffset {
                dc2,
                off2,
                dc3,
                off3,
            } => {
                self.bias.set_duty_and_offset(Channel::Pwm2, dc2, off2, hw);
                self.bias.set_duty_and_offset(Channel::Pwm3, dc3, off3, hw);
            }
            AttWrite::PwmBias { channels } => {
                for (ch, (target_mv, offset_percent)) in Channel::ALL.into_iter().zip(channels) {
                    self.bias.set_target(ch, target_mv);
                    self.bias.set_offset(ch, offset_percent, hw);
                }
            }
            AttWrite::PwmState(true) => {
                if self.bias.enable(hw) {
                    self.bias_handle = self
                        .scheduler
                        .schedule_after(self.config.bias_update_ticks, Task::BiasUpdate);
                    events.emit(&NodeEvent::OutputEnabled);
                }
            }
            AttWrite::PwmState(false) => {
                if self.bias.disable(hw) {
                    self.scheduler.cancel(&mut self.bias_handle);
                    events.emit(&NodeEvent::OutputDisabled);
                }
            }
        }
        Ok(())
    }

    /// Answer a read from the measurement cache. Never interlock-gated.
    pub fn handle_read(&self, raw_handle: u16) -> ReadResponse {
        dispatch::read_response(raw_handle, self.sensor, self.battery)
    }

    /// Answer a peer read through the transport.
    pub fn handle_read_request(&self, raw_handle: u16, sink: &mut impl NotifySink) {
        let response = self.handle_read(raw_handle);
        sink.read_confirm(raw_handle, response.status, &response.value);
    }

    /// Transport-level event indication: confirmed immediately, not
    /// part of the business logic.
    pub fn handle_event_indication(&self, handle: u16, sink: &mut impl NotifySink) {
        sink.confirm_event(handle);
    }

    // -----------------------------------------------------------------
    // Link lifecycle
    // -----------------------------------------------------------------

    pub fn on_session_opened(&mut self, events: &mut impl EventSink) {
        self.session_active = true;
        events.emit(&NodeEvent::SessionOpened);
    }

    /// Session teardown: stop the sensor schedule, drop the output
    /// stage, and reset per-connection subscription state. The battery
    /// monitor keeps running.
    pub fn on_session_closed<H>(&mut self, hw: &mut H, events: &mut impl EventSink)
    where
        H: PwmPort + PowerPort,
    {
        self.session_active = false;
        self.sensor_cccd = 0;
        self.battery_cccd = 0;
        self.scheduler.cancel(&mut self.sensor_handle);
        if self.bias.disable(hw) {
            self.scheduler.cancel(&mut self.bias_handle);
            events.emit(&NodeEvent::OutputDisabled);
        }
        events.emit(&NodeEvent::SessionClosed);
    }

    // -----------------------------------------------------------------
    // Introspection (diagnostics and tests)
    // -----------------------------------------------------------------

    pub fn battery(&self) -> Measurement {
        self.battery
    }

    pub fn sensor(&self) -> Measurement {
        self.sensor
    }

    pub fn interlock(&self) -> bool {
        self.monitor.interlock()
    }

    pub fn output_enabled(&self) -> bool {
        self.bias.is_enabled()
    }

    pub fn sensor_sampling_armed(&self) -> bool {
        self.sensor_handle.is_valid()
    }

    pub fn battery_monitor_armed(&self) -> bool {
        self.monitor_handle.is_valid()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
