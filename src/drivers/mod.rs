pub mod encoder;
pub mod frame;
pub mod imu;
pub mod pll;
pub mod units;

#[cfg(target_os = "none")]
pub mod lsm9ds1;
