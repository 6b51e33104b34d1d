//! BiasNode firmware library.
//!
//! Control core of a battery-powered wireless sensor/actuator node:
//! samples the battery rail and an external sense pad, enforces a
//! hysteretic undervoltage interlock, and runs a closed-loop PWM bias
//! controller that tracks a millivolt target against battery sag. A
//! small attribute (characteristic) table is the only external
//! surface.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       main loop (10 ms)                    │
//! │   link queue ──► NodeService ◄── TickScheduler             │
//! │                     │                                      │
//! │        ┌────────────┼───────────────┐                      │
//! │        ▼            ▼               ▼                      │
//! │  UndervoltageMonitor BiasController att dispatch/notify    │
//! │        │            │               │                      │
//! │        └──────── port traits ───────┘                      │
//! │                     │                                      │
//! │            HardwareAdapter (espidf / host sim)             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything above the port traits is hardware-independent and runs
//! under plain `cargo test` on the host.

pub mod adapters;
pub mod app;
pub mod att;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;
pub mod safety;
pub mod scheduler;
pub mod sensors;

pub use app::NodeService;
pub use config::NodeConfig;
pub use error::{Error, Result};
