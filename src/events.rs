//! Link-event queue between the wireless stack and the main loop.
//!
//! Stack callbacks run in the protocol task; the control core runs in
//! the main loop. Callbacks never touch the service directly — they
//! enqueue a [`LinkEvent`] here and the main loop drains the queue on
//! its own schedule.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ connect/disc cb  │────▶│              │     │              │
//! │ write indication │────▶│  Link Queue  │────▶│  Main Loop   │
//! │ read request     │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

use crate::att::handles::MAX_WRITE_LEN;

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const LINK_QUEUE_CAP: usize = 16;

/// One stack callback, flattened into plain data. Write payloads are
/// copied inline so nothing borrowed from the stack outlives the
/// callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Peer session established.
    Connected,
    /// Peer session torn down.
    Disconnected,
    /// Characteristic write request.
    Write {
        handle: u16,
        len: u8,
        buf: [u8; MAX_WRITE_LEN],
    },
    /// Characteristic read request.
    Read { handle: u16 },
    /// Transport-level event indication needing a confirm.
    EventIndication { handle: u16 },
}

impl LinkEvent {
    /// Build a write event. Payloads beyond the largest characteristic
    /// yield `None`: no table entry can accept them, and truncating
    /// would forge a plausible length for the dispatcher. The write is
    /// dropped whole, like any other length mismatch.
    pub fn write(handle: u16, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_WRITE_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_WRITE_LEN];
        buf[..payload.len()].copy_from_slice(payload);
        Some(Self::Write {
            handle,
            len: payload.len() as u8,
            buf,
        })
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Stack callbacks write (produce), main loop reads (consume).
// Uses atomic head/tail indices kept in statics so the callbacks
// registered with the stack can reach them.

static LINK_HEAD: AtomicU8 = AtomicU8::new(0);
static LINK_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: producer (push_link_event) runs only in the protocol task,
// consumer (pop_link_event) only in the main loop. The head/tail
// atomics enforce the SPSC discipline; a slot is written before the
// head release-store publishes it and read before the tail
// release-store frees it.
static mut LINK_BUFFER: [LinkEvent; LINK_QUEUE_CAP] = [LinkEvent::Disconnected; LINK_QUEUE_CAP];

/// Push an event into the queue. Safe to call from the stack's
/// callback context. Returns `false` if the queue is full.
pub fn push_link_event(event: LinkEvent) -> bool {
    let head = LINK_HEAD.load(Ordering::Relaxed);
    let tail = LINK_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % LINK_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the slot at `head` is unpublished until
    // the release store below.
    unsafe {
        (&raw mut LINK_BUFFER[head as usize]).write(event);
    }

    LINK_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event. Called from the main loop (single consumer).
pub fn pop_link_event() -> Option<LinkEvent> {
    let tail = LINK_TAIL.load(Ordering::Relaxed);
    let head = LINK_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: single consumer; `tail` was published by the producer's
    // release store.
    let event = unsafe { (&raw const LINK_BUFFER[tail as usize]).read() };
    LINK_TAIL.store((tail + 1) % LINK_QUEUE_CAP as u8, Ordering::Release);

    Some(event)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_link_events(mut handler: impl FnMut(LinkEvent)) {
    while let Some(event) = pop_link_event() {
        handler(event);
    }
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = LINK_HEAD.load(Ordering::Relaxed) as usize;
    let tail = LINK_TAIL.load(Ordering::Relaxed) as usize;
    (head + LINK_QUEUE_CAP - tail) % LINK_QUEUE_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test touches the static queue so the SPSC discipline holds
    // under the parallel test runner.
    #[test]
    fn fifo_order_payload_copy_and_overflow() {
        assert_eq!(pop_link_event(), None);

        assert!(push_link_event(LinkEvent::Connected));
        let write = LinkEvent::write(10, &[1, 2, 3, 4]).unwrap();
        assert!(push_link_event(write));
        assert_eq!(queue_len(), 2);

        assert_eq!(pop_link_event(), Some(LinkEvent::Connected));
        let Some(LinkEvent::Write { handle, len, buf }) = pop_link_event() else {
            panic!("expected a write event");
        };
        assert_eq!(handle, 10);
        assert_eq!(len, 4);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(pop_link_event(), None);

        // Oversized payloads never enter the queue: a 14-byte write to
        // the 10-byte bias characteristic must not be cut down to a
        // valid-looking 10 bytes.
        assert!(LinkEvent::write(16, &[0xAA; 14]).is_none());
        assert!(LinkEvent::write(16, &[0xAA; MAX_WRITE_LEN]).is_some());
        assert_eq!(queue_len(), 0);

        // Capacity is CAP - 1; the next push reports a drop.
        for _ in 0..LINK_QUEUE_CAP - 1 {
            assert!(push_link_event(LinkEvent::Disconnected));
        }
        assert!(!push_link_event(LinkEvent::Connected));
        drain_link_events(|_| {});
        assert_eq!(queue_len(), 0);
    }
}
