//! Accelerometer calibration and sensor-to-boom frame rotation.
//!
//! The calibration routines only need the narrow [`AccelBus`] capability, so
//! any accelerometer driver (or a test double) can be plugged in.

use embassy_futures::yield_now;
use micromath::F32Ext;

/// Standard gravity used for g → m/s² (m/s²)
pub const GRAVITY: f32 = 9.81;
/// Hardware FIFO depth used by [`calibrate_fifo`]
pub const FIFO_THRESHOLD: u8 = 0x1F;

// ── Sensor capability ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum AccelScale {
    G2,
    G4,
    G8,
    G16,
}

impl AccelScale {
    /// Resolution (g/LSB)
    pub fn g_per_lsb(self) -> f32 {
        match self {
            Self::G2 => 0.000_061,
            Self::G4 => 0.000_122,
            Self::G8 => 0.000_244,
            Self::G16 => 0.000_732,
        }
    }
}

/// Register-level accelerometer access needed by calibration and telemetry.
#[allow(async_fn_in_trait)]
pub trait AccelBus {
    type Error;

    async fn accel_available(&mut self) -> Result<bool, Self::Error>;
    async fn read_raw_accel(&mut self) -> Result<[i16; 3], Self::Error>;
    async fn temp_available(&mut self) -> Result<bool, Self::Error>;
    async fn read_raw_temp(&mut self) -> Result<i16, Self::Error>;
    async fn fifo_enable(&mut self, enable: bool) -> Result<(), Self::Error>;
    async fn fifo_threshold(&mut self, threshold: u8) -> Result<(), Self::Error>;
    /// Number of samples currently stored in the FIFO.
    async fn fifo_samples(&mut self) -> Result<u8, Self::Error>;
}

// ── Calibration ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct CalibrationState {
    /// Per-axis zero bias (raw LSB), gravity included
    pub zero_offset: [f32; 3],
    /// Mounting angle of the sensor in its X-Y plane (rad)
    pub phi_offset: f32,
}

impl CalibrationState {
    /// Builds the calibration from the mean stationary reading.
    /// Gravity is assumed to lie in the sensor X-Y plane.
    pub fn from_mean(mean: [f32; 3]) -> Self {
        Self {
            zero_offset: mean,
            phi_offset: mean[1].atan2(mean[0]),
        }
    }

    /// Removes the zero bias (raw LSB).
    pub fn correct(&self, raw: [i16; 3]) -> [f32; 3] {
        [
            raw[0] as f32 - self.zero_offset[0],
            raw[1] as f32 - self.zero_offset[1],
            raw[2] as f32 - self.zero_offset[2],
        ]
    }

    /// Raw sample → boom-frame acceleration (m/s²).
    pub fn to_boom_frame(&self, raw: [i16; 3], scale: AccelScale) -> BoomAcceleration {
        let lsb_to_ms2 = scale.g_per_lsb() * GRAVITY;
        let [ax, ay, az] = self.correct(raw);
        rotate_to_boom_frame([ax * lsb_to_ms2, ay * lsb_to_ms2, az * lsb_to_ms2], self.phi_offset)
    }
}

/// Averages `samples` fresh readings. The boom must be held still.
///
/// Each sample is awaited until the sensor reports new data; if data never
/// arrives this never returns.
pub async fn calibrate_stationary<B: AccelBus>(
    bus: &mut B,
    samples: u32,
) -> Result<CalibrationState, B::Error> {
    let samples = samples.max(1);
    let mut sum = [0i64; 3];

    for _ in 0..samples {
        while !bus.accel_available().await? {
            yield_now().await;
        }
        let raw = bus.read_raw_accel().await?;
        for (acc, v) in sum.iter_mut().zip(raw) {
            *acc += v as i64;
        }
    }

    let n = samples as f32;
    Ok(CalibrationState::from_mean([
        sum[0] as f32 / n,
        sum[1] as f32 / n,
        sum[2] as f32 / n,
    ]))
}

/// Averages one full FIFO worth of samples (integer mean, like the
/// sensor's own bias registers) and leaves the FIFO disabled.
pub async fn calibrate_fifo<B: AccelBus>(bus: &mut B) -> Result<CalibrationState, B::Error> {
    bus.fifo_enable(true).await?;
    bus.fifo_threshold(FIFO_THRESHOLD).await?;

    let mut stored = bus.fifo_samples().await?;
    while stored < FIFO_THRESHOLD {
        yield_now().await;
        stored = bus.fifo_samples().await?;
    }

    let mut sum = [0i32; 3];
    for _ in 0..stored {
        let raw = bus.read_raw_accel().await?;
        for (acc, v) in sum.iter_mut().zip(raw) {
            *acc += v as i32;
        }
    }

    bus.fifo_enable(false).await?;
    bus.fifo_threshold(0).await?;

    let n = stored as i32;
    Ok(CalibrationState::from_mean([
        (sum[0] / n) as f32,
        (sum[1] / n) as f32,
        (sum[2] / n) as f32,
    ]))
}

// ── Frame rotation ────────────────────────────────────────────────────────────

/// Acceleration in the boom frame (m/s²). `ddx` is along the boom's
/// direction of travel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct BoomAcceleration {
    pub ddx: f32,
    pub ddy: f32,
    pub ddz: f32,
}

impl BoomAcceleration {
    pub fn in_g(&self) -> [f32; 3] {
        [self.ddx / GRAVITY, self.ddy / GRAVITY, self.ddz / GRAVITY]
    }
}

/// Rotates a sensor-frame sample by `-phi` in the sensor X-Y plane and
/// relabels axes for the board's mounting on the boom end.
pub fn rotate_to_boom_frame(sensor: [f32; 3], phi: f32) -> BoomAcceleration {
    let [ddx_s, ddy_s, ddz_s] = sensor;
    let (sin, cos) = ((-phi).sin(), (-phi).cos());
    BoomAcceleration {
        ddx: ddz_s,
        ddy: ddx_s * cos - ddy_s * sin,
        ddz: ddy_s * cos + ddx_s * sin,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use embassy_futures::block_on;

    /// Scripted accelerometer. Every sample becomes available after
    /// `polls_per_sample` availability checks.
    pub(crate) struct MockAccel {
        pub samples: Vec<[i16; 3]>,
        pub next: usize,
        pub polls_per_sample: u32,
        pub polls: u32,
        pub temp: Option<i16>,
        pub fifo_enabled: bool,
        pub threshold: u8,
        pub fifo_level: u8,
        pub fail: bool,
    }

    impl MockAccel {
        pub fn new(samples: Vec<[i16; 3]>) -> Self {
            Self {
                samples,
                next: 0,
                polls_per_sample: 1,
                polls: 0,
                temp: None,
                fifo_enabled: false,
                threshold: 0,
                fifo_level: 0,
                fail: false,
            }
        }
    }

    #[derive(Debug, PartialEq)]
    pub(crate) struct BusFault;

    impl AccelBus for MockAccel {
        type Error = BusFault;

        async fn accel_available(&mut self) -> Result<bool, BusFault> {
            if self.fail {
                return Err(BusFault);
            }
            if self.next >= self.samples.len() {
                return Ok(false);
            }
            self.polls += 1;
            Ok(self.polls % self.polls_per_sample == 0)
        }

        async fn read_raw_accel(&mut self) -> Result<[i16; 3], BusFault> {
            let sample = self.samples[self.next.min(self.samples.len() - 1)];
            self.next += 1;
            Ok(sample)
        }

        async fn temp_available(&mut self) -> Result<bool, BusFault> {
            Ok(self.temp.is_some())
        }

        async fn read_raw_temp(&mut self) -> Result<i16, BusFault> {
            Ok(self.temp.take().unwrap_or_default())
        }

        async fn fifo_enable(&mut self, enable: bool) -> Result<(), BusFault> {
            self.fifo_enabled = enable;
            Ok(())
        }

        async fn fifo_threshold(&mut self, threshold: u8) -> Result<(), BusFault> {
            self.threshold = threshold;
            Ok(())
        }

        async fn fifo_samples(&mut self) -> Result<u8, BusFault> {
            // FIFO fills by a few samples per poll while enabled
            if self.fifo_enabled {
                self.fifo_level = (self.fifo_level + 4).min(32);
            }
            Ok(self.fifo_level)
        }
    }

    #[test]
    fn stationary_calibration_averages_samples() {
        let samples: Vec<[i16; 3]> = (0..1000)
            .map(|i| {
                let noise = if i % 2 == 0 { 3 } else { -3 };
                [2000 + noise, -3464 - noise, 120 + noise]
            })
            .collect();
        let mut bus = MockAccel::new(samples);
        bus.polls_per_sample = 3;

        let cal = block_on(calibrate_stationary(&mut bus, 1000)).unwrap();

        assert_eq!(bus.next, 1000);
        assert_relative_eq!(cal.zero_offset[0], 2000.0, epsilon = 1e-3);
        assert_relative_eq!(cal.zero_offset[1], -3464.0, epsilon = 1e-3);
        assert_relative_eq!(cal.zero_offset[2], 120.0, epsilon = 1e-3);
        assert_relative_eq!(cal.phi_offset, (-3464.0f32).atan2(2000.0), epsilon = 1e-6);
    }

    #[test]
    fn stationary_calibration_propagates_bus_fault() {
        let mut bus = MockAccel::new(vec![[0, 0, 0]]);
        bus.fail = true;
        assert_eq!(block_on(calibrate_stationary(&mut bus, 10)), Err(BusFault));
    }

    #[test]
    fn zero_sample_request_reads_one_sample() {
        let mut bus = MockAccel::new(vec![[10, 20, 30]]);
        let cal = block_on(calibrate_stationary(&mut bus, 0)).unwrap();
        assert_eq!(cal.zero_offset, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn fifo_calibration_uses_integer_mean_and_disables_fifo() {
        let samples: Vec<[i16; 3]> = (0..32).map(|i| [i as i16, 4096, -7]).collect();
        let mut bus = MockAccel::new(samples);

        let cal = block_on(calibrate_fifo(&mut bus)).unwrap();

        // FIFO level goes 4, 8, .., 32; all 32 samples are drained
        assert_eq!(bus.next, 32);
        // (0 + 1 + .. + 31) / 32 = 15.5, truncated
        assert_eq!(cal.zero_offset, [15.0, 4096.0, -7.0]);
        assert_relative_eq!(cal.phi_offset, 4096.0f32.atan2(15.0), epsilon = 1e-6);
        assert!(!bus.fifo_enabled);
        assert_eq!(bus.threshold, 0);
    }

    #[test]
    fn zero_phi_is_axis_relabel_only() {
        let out = rotate_to_boom_frame([1.0, 2.0, 3.0], 0.0);
        assert_relative_eq!(out.ddx, 3.0);
        assert_relative_eq!(out.ddy, 1.0);
        assert_relative_eq!(out.ddz, 2.0);
    }

    #[test]
    fn rotation_matches_closed_form() {
        let (ddx_s, ddy_s, ddz_s) = (0.7f32, -1.3f32, 9.0f32);
        let phi = 0.6f32;
        let out = rotate_to_boom_frame([ddx_s, ddy_s, ddz_s], phi);

        assert_eq!(out.ddx, ddz_s);
        assert_relative_eq!(out.ddy, ddx_s * (-phi).cos() - ddy_s * (-phi).sin(), epsilon = 1e-6);
        assert_relative_eq!(out.ddz, ddy_s * (-phi).cos() + ddx_s * (-phi).sin(), epsilon = 1e-6);
    }

    #[test]
    fn rotation_preserves_magnitude() {
        let out = rotate_to_boom_frame([3.0, 4.0, 0.0], 1.1);
        assert_relative_eq!((out.ddy * out.ddy + out.ddz * out.ddz).sqrt(), 5.0, epsilon = 1e-5);
    }

    #[test]
    fn calibrated_stationary_sample_reads_zero() {
        let cal = CalibrationState::from_mean([2000.0, -3464.0, 120.0]);
        let out = cal.to_boom_frame([2000, -3464, 120], AccelScale::G8);
        assert_eq!(out, BoomAcceleration::default());
    }

    #[test]
    fn one_g_step_along_sensor_z_is_boom_x() {
        let cal = CalibrationState::default();
        // 1 g at ±8 g is 1 / 0.000244 ≈ 4098 LSB
        let out = cal.to_boom_frame([0, 0, 4098], AccelScale::G8);
        assert_relative_eq!(out.ddx, 4098.0 * 0.000244 * GRAVITY, epsilon = 1e-4);
        assert_relative_eq!(out.in_g()[0], 4098.0 * 0.000244, epsilon = 1e-5);
        assert_eq!(out.ddy, 0.0);
    }
}
