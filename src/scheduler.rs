//! Fixed-rate telemetry scheduling and frame assembly.

use crate::config::{BoomConfig, Geometry};
use crate::drivers::frame::{FrameSink, TelemetryFrame};
use crate::drivers::imu::{AccelBus, AccelScale, BoomAcceleration, CalibrationState};
use crate::state::EstimatorSnapshot;

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum SchedulerState {
    /// Less than one period since the last emission
    Waiting,
    /// Period elapsed; emit one frame now
    Emit,
}

/// Cooperative fixed-rate trigger driven by a microsecond clock.
///
/// When a period has elapsed the elapsed time is reset to zero (not carried
/// over), so a late poll delays every following emission.
pub struct FixedRateScheduler {
    period_us: u64,
    last_us: u64,
    state: SchedulerState,
}

impl FixedRateScheduler {
    pub fn new(period_us: u64, now_us: u64) -> Self {
        Self {
            period_us,
            last_us: now_us,
            state: SchedulerState::Waiting,
        }
    }

    pub fn poll(&mut self, now_us: u64) -> SchedulerState {
        self.state = if now_us.saturating_sub(self.last_us) >= self.period_us {
            self.last_us = now_us;
            SchedulerState::Emit
        } else {
            SchedulerState::Waiting
        };
        self.state
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }
}

// ── Framer ────────────────────────────────────────────────────────────────────

/// Converts estimator output to physical units and keeps the latest IMU
/// readings for the next frame.
pub struct TelemetryFramer {
    geometry: Geometry,
    scale: AccelScale,
    calibration: CalibrationState,
    accel: BoomAcceleration,
    temperature: i32,
}

impl TelemetryFramer {
    pub fn new(config: &BoomConfig, calibration: CalibrationState) -> Self {
        Self {
            geometry: config.geometry,
            scale: config.imu.accel_scale,
            calibration,
            accel: BoomAcceleration::default(),
            temperature: 0,
        }
    }

    /// Picks up new accelerometer/temperature samples if the sensor has
    /// them. Never waits; cached values stay in place otherwise.
    pub async fn refresh<B: AccelBus>(&mut self, bus: &mut B) -> Result<(), B::Error> {
        if bus.accel_available().await? {
            let raw = bus.read_raw_accel().await?;
            self.accel = self.calibration.to_boom_frame(raw, self.scale);
        }
        if bus.temp_available().await? {
            self.temperature = bus.read_raw_temp().await? as i32;
        }
        Ok(())
    }

    pub fn assemble(&self, snapshot: &EstimatorSnapshot) -> TelemetryFrame {
        let yaw = snapshot.yaw.estimate;
        let pitch = snapshot.pitch.estimate;
        TelemetryFrame {
            yaw_count: snapshot.yaw.count,
            pitch_count: snapshot.pitch.count,
            x: self.geometry.yaw_linear(yaw.position),
            y: self.geometry.pitch_linear(pitch.position),
            dx: self.geometry.yaw_linear(yaw.velocity),
            dy: self.geometry.pitch_linear(pitch.velocity),
            accel: self.accel.in_g(),
            temperature: self.temperature,
        }
    }

    /// One scheduler emission: refresh the IMU cache, build the frame and
    /// hand it to the sink. A failed IMU refresh keeps the stale values.
    pub async fn emit<B: AccelBus, S: FrameSink>(
        &mut self,
        bus: &mut B,
        snapshot: &EstimatorSnapshot,
        sink: &mut S,
    ) -> Result<TelemetryFrame, S::Error> {
        let _ = self.refresh(bus).await;
        let frame = self.assemble(snapshot);
        sink.write_frame(&frame.encode()).await?;
        Ok(frame)
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }
}
