//! Discrete PLL position/velocity estimator for quadrature encoders.
//!
//! Equivalent to a critically damped second-order tracking filter: the
//! integer counter is the "phase", the estimated velocity is the integrator
//! state of a PI loop closed around the quantised phase error.
//! Ref: <https://discourse.odriverobotics.com/t/rotor-encoder-pll-and-velocity/224>

use micromath::F32Ext;

use crate::config::PllConfig;
use crate::state::{AxisSample, EstimatorSnapshot};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct AxisEstimate {
    pub position: f32, // counts (fractional)
    pub velocity: f32, // counts/s
}

impl AxisEstimate {
    pub const ZERO: Self = Self {
        position: 0.0,
        velocity: 0.0,
    };
}

pub struct PllEstimator {
    period: f32,
    kp: f32,
    ki: f32,
    state: AxisEstimate,
}

impl PllEstimator {
    pub fn new(config: &PllConfig) -> Self {
        Self {
            period: config.period(),
            kp: config.kp(),
            ki: config.ki(),
            state: AxisEstimate::ZERO,
        }
    }

    /// One estimator tick. Must be called exactly once per PLL period.
    /// raw: current encoder count
    pub fn update(&mut self, raw: i32) -> AxisEstimate {
        // Open-loop propagation since the previous tick
        self.state.position += self.period * self.state.velocity;

        // Discrete phase detector
        let delta = raw.wrapping_sub(self.state.position.floor() as i32) as f32;

        // PI feedback
        self.state.position += self.period * self.kp * delta;
        self.state.velocity += self.period * self.ki * delta;

        self.state
    }

    pub fn estimate(&self) -> AxisEstimate {
        self.state
    }
}

/// Pitch and yaw estimators sharing one tuning.
pub struct DualAxisPll {
    pitch: PllEstimator,
    yaw: PllEstimator,
}

impl DualAxisPll {
    pub fn new(config: &PllConfig) -> Self {
        Self {
            pitch: PllEstimator::new(config),
            yaw: PllEstimator::new(config),
        }
    }

    pub fn update(&mut self, pitch_count: i32, yaw_count: i32) -> EstimatorSnapshot {
        EstimatorSnapshot {
            pitch: AxisSample {
                count: pitch_count,
                estimate: self.pitch.update(pitch_count),
            },
            yaw: AxisSample {
                count: yaw_count,
                estimate: self.yaw.update(yaw_count),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKS_PER_S: i64 = 10_000;

    /// Counter value after `tick` ticks at a constant velocity (floor semantics).
    fn ramp(start: i32, counts_per_s: i64, tick: i64) -> i32 {
        start + (counts_per_s * tick).div_euclid(TICKS_PER_S) as i32
    }

    #[test]
    fn stationary_counter_keeps_zero_estimate() {
        let mut pll = PllEstimator::new(&PllConfig::DEFAULT);
        for _ in 0..1000 {
            pll.update(0);
        }
        assert_eq!(pll.estimate(), AxisEstimate::ZERO);
    }

    #[test]
    fn velocity_converges_without_overshoot() {
        let mut pll = PllEstimator::new(&PllConfig::DEFAULT);
        let v = 1000;
        let mut peak = f32::MIN;

        for tick in 0..2 * TICKS_PER_S {
            let est = pll.update(ramp(0, v, tick));
            peak = peak.max(est.velocity);
        }

        let est = pll.estimate();
        assert!((est.velocity - v as f32).abs() <= 2.0, "velocity {}", est.velocity);
        // Quantisation allows about one count/s of ripple above the true value
        assert!(peak <= v as f32 + 2.0, "overshoot to {}", peak);
    }

    #[test]
    fn negative_velocity_converges() {
        let mut pll = PllEstimator::new(&PllConfig::DEFAULT);
        for tick in 0..2 * TICKS_PER_S {
            pll.update(ramp(0, -250, tick));
        }
        let est = pll.estimate();
        assert!((est.velocity + 250.0).abs() <= 2.0, "velocity {}", est.velocity);
        assert!((est.position + 500.0).abs() <= 2.0, "position {}", est.position);
    }

    #[test]
    fn position_tracks_bounded_acceleration() {
        // 2000 counts peak, 0.5 Hz sine: ~2e4 counts/s² peak acceleration
        let mut pll = PllEstimator::new(&PllConfig::DEFAULT);
        let mut worst = 0.0f32;

        for tick in 0..4 * TICKS_PER_S {
            let t = tick as f64 / TICKS_PER_S as f64;
            let raw = (2000.0 * (core::f64::consts::PI * t).sin()).floor() as i32;
            let est = pll.update(raw);
            if tick > 2000 {
                worst = worst.max((est.position - raw as f32).abs());
            }
        }

        assert!(worst < 5.0, "tracking error {}", worst);
    }

    #[test]
    fn dual_axis_runs_axes_independently() {
        let mut pll = DualAxisPll::new(&PllConfig::DEFAULT);
        let mut snap = EstimatorSnapshot::default();
        for tick in 0..TICKS_PER_S {
            snap = pll.update(ramp(744, 100, tick), 0);
        }

        assert_eq!(snap.pitch.count, 843);
        assert!((snap.pitch.estimate.velocity - 100.0).abs() <= 2.0);
        assert_eq!(snap.yaw.count, 0);
        assert_eq!(snap.yaw.estimate, AxisEstimate::ZERO);
    }
}
