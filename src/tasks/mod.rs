use embassy_stm32::peripherals::{DMA1_CH0, DMA1_CH7, I2C1, TIM3, TIM4};

use boom_telemetry::drivers::encoder::QuadEncoder;
use boom_telemetry::drivers::lsm9ds1::Lsm9ds1;

pub mod pll_task;
pub mod telemetry_task;

pub type Imu = Lsm9ds1<'static, I2C1, DMA1_CH7, DMA1_CH0>;
pub type PitchEncoder = QuadEncoder<'static, TIM3>;
pub type YawEncoder = QuadEncoder<'static, TIM4>;
