//! Unified error types for the BiasNode firmware.
//!
//! Small `Copy` enums with `Display` impls that every subsystem can
//! convert into, keeping the top-level loop's error handling uniform
//! and allocation-free. Nothing in the control core escalates to a
//! fatal abort; a rejected write is a value, not a panic.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An attribute write was dropped by the dispatcher.
    Write(WriteReject),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(r) => write!(f, "write rejected: {r}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Attribute write rejection
// ---------------------------------------------------------------------------

/// Why a characteristic write was dropped.
///
/// The remote peer never sees these; a rejected write is a silent drop
/// at the protocol level. Handlers return them so the drop is still
/// observable in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReject {
    /// The undervoltage interlock is asserted. All mutating writes are
    /// refused until the battery recovers.
    InterlockAsserted,
    /// Payload length does not match the handler's fixed expectation.
    BadLength { got: usize, expected: usize },
    /// An enumerated field is outside its legal domain (clock divider,
    /// clock source, output state byte). The whole write is dropped,
    /// never clamped.
    BadValue,
    /// The handle does not map to any writable characteristic.
    UnknownHandle,
}

impl fmt::Display for WriteReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterlockAsserted => write!(f, "undervoltage interlock asserted"),
            Self::BadLength { got, expected } => {
                write!(f, "payload length {got} (expected {expected})")
            }
            Self::BadValue => write!(f, "enumerated field out of range"),
            Self::UnknownHandle => write!(f, "unknown or non-writable handle"),
        }
    }
}

impl From<WriteReject> for Error {
    fn from(r: WriteReject) -> Self {
        Self::Write(r)
    }
}

// ---------------------------------------------------------------------------
// ATT status codes
// ---------------------------------------------------------------------------

/// Status byte carried in a read response, mirroring the stack's ATT
/// error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttStatus {
    /// `ATT_ERR_NO_ERROR`
    Ok = 0x00,
    /// `ATT_ERR_APP_ERROR`, returned for reads of unknown targets.
    AppError = 0x80,
}

impl fmt::Display for AttStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "no error"),
            Self::AppError => write!(f, "application error"),
        }
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_reject_converts_into_error() {
        let e: Error = WriteReject::BadValue.into();
        assert_eq!(e, Error::Write(WriteReject::BadValue));
    }

    #[test]
    fn display_is_human_readable() {
        let r = WriteReject::BadLength { got: 3, expected: 4 };
        assert_eq!(r.to_string(), "payload length 3 (expected 4)");
        assert_eq!(
            Error::Write(WriteReject::InterlockAsserted).to_string(),
            "write rejected: undervoltage interlock asserted"
        );
    }
}
