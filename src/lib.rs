//! Boom telemetry core.
//!
//! Quadrature encoder counts are tracked by a 10 kHz PLL estimator, the
//! accelerometer is calibrated while the boom is stationary and rotated into
//! the boom frame, and a 1 kHz scheduler packs everything into fixed binary
//! frames for the host.
//!
//! Everything outside `drivers::lsm9ds1` and the quadrature binding in
//! `drivers::encoder` is platform independent and unit-tested on the host.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod drivers;
pub mod scheduler;
pub mod state;
