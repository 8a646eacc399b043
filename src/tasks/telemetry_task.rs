use defmt::{debug, warn};
use embassy_executor::task;
use embassy_futures::yield_now;
use embassy_time::Instant;

use boom_telemetry::scheduler::{FixedRateScheduler, SchedulerState, TelemetryFramer};
use boom_telemetry::state::SharedEstimates;

use super::Imu;
use crate::usb::UsbFrameSink;

/// Frames between two status lines on the debug probe (5 s at 1 kHz)
const STATUS_EVERY: u32 = 5000;

/// Telemetry task — 1 kHz, thread-mode executor.
/// Snapshots the PLL output, refreshes the IMU cache without waiting and
/// writes one frame per period to the host.
#[task]
pub async fn telemetry_task(
    mut imu: Imu,
    mut sink: UsbFrameSink<'static>,
    mut framer: TelemetryFramer,
    estimates: &'static SharedEstimates,
    period_us: u64,
) {
    let mut scheduler = FixedRateScheduler::new(period_us, Instant::now().as_micros());
    let mut sent: u32 = 0;
    let mut failed: u32 = 0;

    loop {
        if scheduler.poll(Instant::now().as_micros()) == SchedulerState::Waiting {
            yield_now().await;
            continue;
        }

        let snapshot = estimates.snapshot();
        match framer.emit(&mut imu, &snapshot, &mut sink).await {
            Ok(_) => {
                sent = sent.wrapping_add(1);
                if sent % STATUS_EVERY == 0 {
                    debug!(
                        "[TEL] sent={} failed={} pitch={} yaw={}",
                        sent, failed, snapshot.pitch, snapshot.yaw
                    );
                }
            }
            Err(e) => {
                failed = failed.wrapping_add(1);
                if failed == 1 {
                    warn!("telemetry write failed: {}", e);
                }
            }
        }
    }
}
