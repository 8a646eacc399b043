use defmt::info;
use embassy_executor::task;
use embassy_time::{Duration, Ticker};

use boom_telemetry::config::PllConfig;
use boom_telemetry::drivers::encoder::EncoderSource;
use boom_telemetry::drivers::pll::DualAxisPll;
use boom_telemetry::state::SharedEstimates;

use super::{PitchEncoder, YawEncoder};

/// PLL estimator task — 10 kHz, runs on the high-priority interrupt executor.
/// Only reads the encoder counters and publishes the estimate; all serial
/// I/O stays in the thread-mode executor.
#[task]
pub async fn pll_task(
    mut pitch: PitchEncoder,
    mut yaw: YawEncoder,
    config: PllConfig,
    estimates: &'static SharedEstimates,
) {
    let mut pll = DualAxisPll::new(&config);
    info!(
        "PLL {} Hz, bandwidth {} rad/s (kp={}, ki={})",
        config.freq_hz,
        config.bandwidth,
        config.kp(),
        config.ki()
    );

    let mut ticker = Ticker::every(Duration::from_hz(config.freq_hz as u64));
    loop {
        ticker.next().await;

        let snapshot = pll.update(pitch.read(), yaw.read());
        estimates.publish(snapshot);
    }
}
