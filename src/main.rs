//! Boom telemetry firmware for the STM32F405.
//!
//! Startup: clocks → USB → IMU init/calibration (boom held still, LED on) →
//! wait for the pitch index pulse → 10 kHz PLL on the interrupt executor →
//! 1 kHz telemetry on the thread executor. Runs until power-off.
#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod board;
#[cfg(target_os = "none")]
mod tasks;
#[cfg(target_os = "none")]
mod usb;

#[cfg(target_os = "none")]
use {
    boom_telemetry::config::{BoomConfig, CalibrationMode},
    boom_telemetry::drivers::encoder::{EncoderSource, QuadEncoder},
    boom_telemetry::drivers::imu::{calibrate_fifo, calibrate_stationary},
    boom_telemetry::drivers::lsm9ds1::Lsm9ds1,
    boom_telemetry::scheduler::TelemetryFramer,
    boom_telemetry::state::SharedEstimates,
    defmt::{error, info},
    embassy_executor::{InterruptExecutor, Spawner},
    embassy_stm32::exti::ExtiInput,
    embassy_stm32::gpio::{Input, Level, Output, Pull, Speed},
    embassy_stm32::i2c::I2c,
    embassy_stm32::interrupt,
    embassy_stm32::interrupt::InterruptExt,
    embassy_stm32::time::Hertz as TimeHertz,
    embassy_stm32::timer::qei::{Qei, QeiPin},
    embassy_stm32::{bind_interrupts, peripherals},
    embassy_time::{Duration, Timer},
    {defmt_rtt as _, panic_probe as _},
};

#[cfg(target_os = "none")]
use crate::{
    board::Board,
    tasks::pll_task::pll_task,
    tasks::telemetry_task::telemetry_task,
    usb::UsbFrameSink,
};

#[cfg(target_os = "none")]
const CONFIG: BoomConfig = BoomConfig::DEFAULT;

// ── Shared state ──────────────────────────────────────────────────────────────
//  Written by the PLL task only, read by the telemetry task only.
#[cfg(target_os = "none")]
static ESTIMATES: SharedEstimates = SharedEstimates::new();

// ── High-priority executor (PLL) ──────────────────────────────────────────────
#[cfg(target_os = "none")]
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[cfg(target_os = "none")]
#[interrupt]
unsafe fn UART5() {
    EXECUTOR_HIGH.on_interrupt()
}

// ── Interrupt bindings ────────────────────────────────────────────────────────
#[cfg(target_os = "none")]
bind_interrupts!(struct Irqs {
    I2C1_EV => embassy_stm32::i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => embassy_stm32::i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

/// Parks the firmware forever. Nothing is ever sent to the host.
#[cfg(target_os = "none")]
async fn halt() -> ! {
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────
#[cfg(target_os = "none")]
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;

    // 2. USB CDC-ACM: telemetry link to the host
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();

    // 3. I2C1 @ 400 kHz — LSM9DS1 (SCL=PB8, SDA=PB9)
    let i2c = I2c::new(
        p.I2C1,
        p.PB8, p.PB9,
        Irqs,
        p.DMA1_CH7,
        p.DMA1_CH0,
        TimeHertz(400_000),
        Default::default(),
    );
    board::configure_io_priorities();

    // 4. Status LED (PC13): on while calibrating, on again once homed
    let mut led = Output::new(p.PC13, Level::Low, Speed::Low);

    // 5. IMU init: gyro + mag off, accel 952 Hz
    Timer::after(Duration::from_millis(100)).await;
    let mut imu = Lsm9ds1::new(i2c);
    if let Err(e) = imu.init(CONFIG.imu.accel_scale).await {
        error!("Failed to initialize IMU: {}", e);
        halt().await;
    }

    // 6. Stationary calibration. The boom must not move.
    led.set_high();
    let calibration = match CONFIG.imu.calibration {
        CalibrationMode::Stationary { samples } => calibrate_stationary(&mut imu, samples).await,
        CalibrationMode::Fifo => calibrate_fifo(&mut imu).await,
    };
    let calibration = match calibration {
        Ok(c) => c,
        Err(e) => {
            error!("IMU calibration failed: {}", e);
            halt().await
        }
    };
    led.set_low();
    info!(
        "IMU calibrated: zero_offset={} phi_offset={} rad",
        calibration.zero_offset, calibration.phi_offset
    );

    // 7. Encoders: pitch TIM3 (PB4/PB5), yaw TIM4 (PB6/PB7)
    let mut pitch = QuadEncoder::new(Qei::new(
        p.TIM3,
        QeiPin::new_ch1(p.PB4),
        QeiPin::new_ch2(p.PB5),
    ));
    let mut yaw = QuadEncoder::new(Qei::new(
        p.TIM4,
        QeiPin::new_ch1(p.PB6),
        QeiPin::new_ch2(p.PB7),
    ));

    // 8. Home on the pitch index pulse (PA2, falling edge)
    {
        let mut index = ExtiInput::new(Input::new(p.PA2, Pull::Up), p.EXTI2);
        info!("Waiting for pitch index");
        index.wait_for_falling_edge().await;
        yaw.write(0);
        pitch.write(CONFIG.geometry.pitch_index_pos);
    }
    led.set_high();
    info!("Homed: pitch={} yaw=0", CONFIG.geometry.pitch_index_pos);

    // 9. PLL estimator on the interrupt executor, above USB and I2C
    interrupt::UART5.set_priority(board::PLL_PRIORITY);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::UART5);
    high_spawner
        .spawn(pll_task(pitch, yaw, CONFIG.pll, &ESTIMATES))
        .unwrap();

    // 10. Telemetry at 1 kHz in thread mode
    let framer = TelemetryFramer::new(&CONFIG, calibration);
    spawner
        .spawn(telemetry_task(
            imu,
            UsbFrameSink::new(usb_serial),
            framer,
            &ESTIMATES,
            CONFIG.telemetry.period_us(),
        ))
        .unwrap();
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("boom-telemetry is firmware; build it with --target thumbv7em-none-eabihf");
}
