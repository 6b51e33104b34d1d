//! Adapters binding the application ports to the outside world.

pub mod hardware;
pub mod log_sink;

pub use hardware::HardwareAdapter;
pub use log_sink::LogEventSink;
