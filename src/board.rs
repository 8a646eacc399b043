use embassy_stm32::interrupt::{self, InterruptExt, Priority};
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::Config;

/// PLL interrupt executor. Above every transport/bus interrupt; only the
/// time driver may preempt it.
pub const PLL_PRIORITY: Priority = Priority::P1;
pub const USB_PRIORITY: Priority = Priority::P4;
pub const I2C_PRIORITY: Priority = Priority::P5;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2), // 168 MHz
            divq: Some(PllQDiv::DIV7), // 48 MHz USB
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        let p = embassy_stm32::init(config);

        Self { p }
    }
}

/// Drops USB and I2C below the PLL executor. Call after the drivers are
/// created (they enable their interrupts at the default priority).
pub fn configure_io_priorities() {
    interrupt::OTG_FS.set_priority(USB_PRIORITY);
    interrupt::I2C1_EV.set_priority(I2C_PRIORITY);
    interrupt::I2C1_ER.set_priority(I2C_PRIORITY);
}
