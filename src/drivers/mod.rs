//! Low-level peripheral drivers (target-gated).

pub mod hw_init;
