//! Application layer: the hardware-independent control core.
//!
//! [`service::NodeService`] owns all retained state and sequences the
//! periodic activities; [`ports`] defines what it needs from the
//! outside world; [`events`] is what it tells the outside world.

pub mod events;
pub mod ports;
pub mod service;

pub use service::NodeService;
