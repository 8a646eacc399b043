//! LSM9DS1 accelerometer over I2C, accel + temperature only.
//! Gyro and magnetometer are powered down.

use embassy_stm32::i2c::{Error, I2c, Instance, RxDma, TxDma};
use embassy_time::{Duration, Timer};

use super::imu::{AccelBus, AccelScale};

const ADDR_XG: u8 = 0x6B;
const ADDR_M: u8 = 0x1E;

const REG_WHO_AM_I_XG: u8 = 0x0F;
const REG_CTRL_REG1_G: u8 = 0x10;
const REG_OUT_TEMP_L: u8 = 0x15;
const REG_CTRL_REG5_XL: u8 = 0x1F;
const REG_CTRL_REG6_XL: u8 = 0x20;
const REG_CTRL_REG7_XL: u8 = 0x21;
const REG_CTRL_REG8: u8 = 0x22;
const REG_CTRL_REG9: u8 = 0x23;
const REG_STATUS: u8 = 0x27;
const REG_OUT_X_L_XL: u8 = 0x28;
const REG_FIFO_CTRL: u8 = 0x2E;
const REG_FIFO_SRC: u8 = 0x2F;
const REG_CTRL_REG3_M: u8 = 0x22;

const WHO_AM_I_XG: u8 = 0x68;

const STATUS_XLDA: u8 = 0x01;
const STATUS_TDA: u8 = 0x04;

const CTRL8_SW_RESET: u8 = 0x01;
const CTRL8_IF_ADD_INC: u8 = 0x04;
const CTRL8_BDU: u8 = 0x40;
const CTRL9_FIFO_EN: u8 = 0x02;

const FIFO_MODE_BYPASS: u8 = 0x00;
const FIFO_MODE_FIFO: u8 = 0x20;

#[derive(Debug, defmt::Format)]
pub enum Lsm9ds1Error {
    Bus(Error),
    /// Device answered with an unexpected ID
    WhoAmI(u8),
}

impl From<Error> for Lsm9ds1Error {
    fn from(e: Error) -> Self {
        Self::Bus(e)
    }
}

pub struct Lsm9ds1<'d, T: Instance, Tx, Rx> {
    i2c: I2c<'d, T, Tx, Rx>,
    fifo_mode: u8,
}

impl<'d, T: Instance, Tx: TxDma<T>, Rx: RxDma<T>> Lsm9ds1<'d, T, Tx, Rx> {
    pub fn new(i2c: I2c<'d, T, Tx, Rx>) -> Self {
        Self {
            i2c,
            fifo_mode: FIFO_MODE_BYPASS,
        }
    }

    fn write_reg(&mut self, addr: u8, reg: u8, val: u8) -> Result<(), Error> {
        self.i2c.blocking_write(addr, &[reg, val])
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.i2c.blocking_write_read(ADDR_XG, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    pub async fn init(&mut self, scale: AccelScale) -> Result<(), Lsm9ds1Error> {
        // Soft reset, keep register auto-increment
        self.write_reg(ADDR_XG, REG_CTRL_REG8, CTRL8_SW_RESET | CTRL8_IF_ADD_INC)?;
        Timer::after(Duration::from_millis(10)).await;

        let id = self.read_reg(REG_WHO_AM_I_XG)?;
        if id != WHO_AM_I_XG {
            return Err(Lsm9ds1Error::WhoAmI(id));
        }

        // Gyro power-down: accelerometer-only mode
        self.write_reg(ADDR_XG, REG_CTRL_REG1_G, 0x00)?;

        // X/Y/Z enabled
        self.write_reg(ADDR_XG, REG_CTRL_REG5_XL, 0x38)?;

        // ODR 952 Hz | full scale | bandwidth from BW_XL (408 Hz)
        let fs_bits = match scale {
            AccelScale::G2 => 0b00,
            AccelScale::G16 => 0b01,
            AccelScale::G4 => 0b10,
            AccelScale::G8 => 0b11,
        };
        self.write_reg(ADDR_XG, REG_CTRL_REG6_XL, (0b110 << 5) | (fs_bits << 3) | 0x04)?;

        // High resolution, digital LPF ODR/50
        self.write_reg(ADDR_XG, REG_CTRL_REG7_XL, 0x80)?;

        // Block data update so the 6 output bytes come from one sample
        self.write_reg(ADDR_XG, REG_CTRL_REG8, CTRL8_BDU | CTRL8_IF_ADD_INC)?;

        // Magnetometer power-down
        self.write_reg(ADDR_M, REG_CTRL_REG3_M, 0x03)?;

        Timer::after(Duration::from_millis(100)).await;
        Ok(())
    }
}

impl<'d, T: Instance, Tx: TxDma<T>, Rx: RxDma<T>> AccelBus for Lsm9ds1<'d, T, Tx, Rx> {
    type Error = Error;

    async fn accel_available(&mut self) -> Result<bool, Error> {
        Ok(self.read_reg(REG_STATUS)? & STATUS_XLDA != 0)
    }

    async fn read_raw_accel(&mut self) -> Result<[i16; 3], Error> {
        let mut buf = [0u8; 6];
        self.i2c.blocking_write_read(ADDR_XG, &[REG_OUT_X_L_XL], &mut buf)?;

        let ax = i16::from_le_bytes([buf[0], buf[1]]);
        let ay = i16::from_le_bytes([buf[2], buf[3]]);
        let az = i16::from_le_bytes([buf[4], buf[5]]);

        Ok([ax, ay, az])
    }

    async fn temp_available(&mut self) -> Result<bool, Error> {
        Ok(self.read_reg(REG_STATUS)? & STATUS_TDA != 0)
    }

    async fn read_raw_temp(&mut self) -> Result<i16, Error> {
        let mut buf = [0u8; 2];
        self.i2c.blocking_write_read(ADDR_XG, &[REG_OUT_TEMP_L], &mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    async fn fifo_enable(&mut self, enable: bool) -> Result<(), Error> {
        let ctrl9 = self.read_reg(REG_CTRL_REG9)?;
        let ctrl9 = if enable {
            ctrl9 | CTRL9_FIFO_EN
        } else {
            ctrl9 & !CTRL9_FIFO_EN
        };
        self.write_reg(ADDR_XG, REG_CTRL_REG9, ctrl9)?;

        self.fifo_mode = if enable { FIFO_MODE_FIFO } else { FIFO_MODE_BYPASS };
        let fth = self.read_reg(REG_FIFO_CTRL)? & 0x1F;
        self.write_reg(ADDR_XG, REG_FIFO_CTRL, self.fifo_mode | fth)
    }

    async fn fifo_threshold(&mut self, threshold: u8) -> Result<(), Error> {
        self.write_reg(ADDR_XG, REG_FIFO_CTRL, self.fifo_mode | (threshold & 0x1F))
    }

    async fn fifo_samples(&mut self) -> Result<u8, Error> {
        Ok(self.read_reg(REG_FIFO_SRC)? & 0x3F)
    }
}
