//! BiasNode firmware — main entry point.
//!
//! Boot sequence: link ESP-IDF patches, bring up logging and the
//! peripherals, construct the control core, then loop at the 10 ms
//! base tick draining the link-event queue and advancing the
//! scheduler. The wireless stack lives outside this binary's logic:
//! its callbacks push [`LinkEvent`]s and its send API sits behind the
//! notify sink.

use anyhow::Result;
use log::{error, info};

use biasnode::adapters::{HardwareAdapter, LogEventSink};
use biasnode::app::ports::NotifySink;
use biasnode::app::NodeService;
use biasnode::config::{NodeConfig, TICK_UNIT_MS};
use biasnode::drivers::hw_init;
use biasnode::error::AttStatus;
use biasnode::events::{self, LinkEvent};

/// Notify sink bound to the attribute stack's send path.
///
/// The stack integration is intentionally thin: outbound frames are
/// handed to the protocol task, which owns the radio.
struct StackNotifySink;

impl NotifySink for StackNotifySink {
    fn notify(&mut self, handle: u16, payload: &[u8]) {
        log::debug!("NTF | handle={} len={}", handle, payload.len());
        // Handed to the protocol task's notification queue here.
    }

    fn confirm_event(&mut self, handle: u16) {
        log::debug!("EVT | confirm handle={}", handle);
    }

    fn read_confirm(&mut self, handle: u16, status: AttStatus, value: &[u8]) {
        log::debug!(
            "READ | handle={} status={} len={}",
            handle,
            status,
            value.len()
        );
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BiasNode v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt; the
        // watchdog resets us after its timeout.
        error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Control core ───────────────────────────────────────
    let config = NodeConfig::default();
    let mut service = NodeService::new(config)?;
    let mut hw = HardwareAdapter::new();
    let mut sink = StackNotifySink;
    let mut log_sink = LogEventSink::new();

    service.start(&mut hw, &mut log_sink);
    info!("System ready. Entering event loop.");

    // ── 4. Event loop (10 ms base tick) ───────────────────────
    loop {
        esp_idf_hal::delay::FreeRtos::delay_ms(TICK_UNIT_MS);

        events::drain_link_events(|event| match event {
            LinkEvent::Connected => service.on_session_opened(&mut log_sink),
            LinkEvent::Disconnected => service.on_session_closed(&mut hw, &mut log_sink),
            LinkEvent::Write { handle, len, buf } => {
                // Rejections are already surfaced through the event
                // sink; a dropped write has no further effect.
                let _ = service.handle_write(
                    handle,
                    &buf[..usize::from(len)],
                    &mut hw,
                    &mut log_sink,
                );
            }
            LinkEvent::Read { handle } => service.handle_read_request(handle, &mut sink),
            LinkEvent::EventIndication { handle } => {
                service.handle_event_indication(handle, &mut sink);
            }
        });

        service.tick(&mut hw, &mut sink, &mut log_sink);
    }
}
