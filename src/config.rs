//! Immutable configuration passed into the estimator, framer and scheduler.

use crate::drivers::imu::AccelScale;

/// Damping ratio of the tracking loop. 1.0 is critical damping.
const PLL_DAMPING: f32 = 1.0;

// ── PLL ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PllConfig {
    /// Estimator tick rate (Hz)
    pub freq_hz: u32,
    /// Loop bandwidth ωn (rad/s)
    pub bandwidth: f32,
}

impl PllConfig {
    pub const DEFAULT: Self = Self {
        freq_hz: 10_000,
        bandwidth: 100.0,
    };

    /// Tick period in seconds.
    pub fn period(&self) -> f32 {
        1.0 / self.freq_hz as f32
    }

    pub fn period_us(&self) -> u64 {
        1_000_000 / self.freq_hz as u64
    }

    /// Proportional gain, `2·ζ·ωn`.
    pub fn kp(&self) -> f32 {
        2.0 * PLL_DAMPING * self.bandwidth
    }

    /// Integral gain, `0.25·Kp²` (critically damped).
    pub fn ki(&self) -> f32 {
        let kp = self.kp();
        0.25 * kp * kp
    }
}

// ── Boom geometry ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Encoder counts per revolution
    pub cpr: u32,
    /// Encoder-to-joint reduction
    pub gear_ratio: u32,
    /// Pivot to boom-end mounting distance (m)
    pub yaw_radius_m: f32,
    /// Pivot to pivot distance (m)
    pub pitch_radius_m: f32,
    /// Pitch count loaded when the index pulse fires
    pub pitch_index_pos: i32,
}

impl Geometry {
    pub const DEFAULT: Self = Self {
        cpr: 4096,
        gear_ratio: 4,
        yaw_radius_m: 2.558,
        pitch_radius_m: 2.475,
        pitch_index_pos: 744,
    };

    /// Counts per joint revolution.
    pub fn counts_per_rev(&self) -> f32 {
        (self.cpr * self.gear_ratio) as f32
    }
}

// ── IMU ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationMode {
    /// Average `samples` fresh readings, waiting on each one.
    Stationary { samples: u32 },
    /// Average one full hardware FIFO (31 samples).
    Fifo,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuConfig {
    pub accel_scale: AccelScale,
    pub calibration: CalibrationMode,
}

impl ImuConfig {
    pub const DEFAULT: Self = Self {
        accel_scale: AccelScale::G8,
        calibration: CalibrationMode::Stationary { samples: 1000 },
    };
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryConfig {
    pub rate_hz: u32,
}

impl TelemetryConfig {
    pub const DEFAULT: Self = Self { rate_hz: 1000 };

    pub fn period_us(&self) -> u64 {
        1_000_000 / self.rate_hz as u64
    }
}

/// Whole-system configuration, fixed at build time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoomConfig {
    pub pll: PllConfig,
    pub geometry: Geometry,
    pub imu: ImuConfig,
    pub telemetry: TelemetryConfig,
}

impl BoomConfig {
    pub const DEFAULT: Self = Self {
        pll: PllConfig::DEFAULT,
        geometry: Geometry::DEFAULT,
        imu: ImuConfig::DEFAULT,
        telemetry: TelemetryConfig::DEFAULT,
    };
}

impl Default for BoomConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
