//! Shared state between the PLL interrupt executor and the telemetry loop.
//!
//! All types are `Copy` so a snapshot can be taken inside a short critical
//! section and used outside of it.
use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::drivers::pll::AxisEstimate;

// ── Data types ────────────────────────────────────────────────────────────────

/// Raw counter value and PLL estimate of one axis, taken on the same tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct AxisSample {
    pub count: i32,
    pub estimate: AxisEstimate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct EstimatorSnapshot {
    pub pitch: AxisSample,
    pub yaw: AxisSample,
}

// ── Publication ───────────────────────────────────────────────────────────────

/// Estimator output published by the PLL task (only writer) and read by the
/// telemetry task (only reader).
///
/// The critical section covers the copy only, so both axes and both fields
/// of each axis always come from the same PLL tick.
pub struct SharedEstimates {
    inner: Mutex<CriticalSectionRawMutex, Cell<EstimatorSnapshot>>,
}

impl SharedEstimates {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(EstimatorSnapshot {
                pitch: AxisSample {
                    count: 0,
                    estimate: AxisEstimate::ZERO,
                },
                yaw: AxisSample {
                    count: 0,
                    estimate: AxisEstimate::ZERO,
                },
            })),
        }
    }

    pub fn publish(&self, snapshot: EstimatorSnapshot) {
        self.inner.lock(|cell| cell.set(snapshot));
    }

    pub fn snapshot(&self) -> EstimatorSnapshot {
        self.inner.lock(|cell| cell.get())
    }
}

impl Default for SharedEstimates {
    fn default() -> Self {
        Self::new()
    }
}
