//! Quadrature encoder position source.
//!
//! The timer peripherals count in 16 bits; `CountExtender` widens that into a
//! signed 32-bit position by accumulating wrapping deltas. The counter must be
//! sampled at least once per half counter period, which the 10 kHz PLL tick
//! guarantees for any physically reachable boom speed.

pub trait EncoderSource {
    /// Current position (counts).
    fn read(&mut self) -> i32;
    /// Reload the position, e.g. when the index pulse is seen.
    fn write(&mut self, count: i32);
}

#[derive(Clone, Copy, Debug)]
pub struct CountExtender {
    last_raw: u16,
    count: i32,
}

impl CountExtender {
    pub const fn new(raw: u16) -> Self {
        Self { last_raw: raw, count: 0 }
    }

    pub fn update(&mut self, raw: u16) -> i32 {
        let delta = raw.wrapping_sub(self.last_raw) as i16;
        self.last_raw = raw;
        self.count = self.count.wrapping_add(delta as i32);
        self.count
    }

    /// Make `raw` correspond to position `count`.
    pub fn set(&mut self, raw: u16, count: i32) {
        self.last_raw = raw;
        self.count = count;
    }

    pub fn count(&self) -> i32 {
        self.count
    }
}

#[cfg(target_os = "none")]
pub use self::qei::QuadEncoder;

#[cfg(target_os = "none")]
mod qei {
    use embassy_stm32::timer::qei::Qei;
    use embassy_stm32::timer::CaptureCompare16bitInstance;

    use super::{CountExtender, EncoderSource};

    pub struct QuadEncoder<'d, T: CaptureCompare16bitInstance> {
        qei: Qei<'d, T>,
        counter: CountExtender,
    }

    impl<'d, T: CaptureCompare16bitInstance> QuadEncoder<'d, T> {
        pub fn new(qei: Qei<'d, T>) -> Self {
            let counter = CountExtender::new(qei.count());
            Self { qei, counter }
        }
    }

    impl<'d, T: CaptureCompare16bitInstance> EncoderSource for QuadEncoder<'d, T> {
        fn read(&mut self) -> i32 {
            self.counter.update(self.qei.count())
        }

        fn write(&mut self, count: i32) {
            self.counter.set(self.qei.count(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_small_steps() {
        let mut c = CountExtender::new(100);
        assert_eq!(c.update(105), 5);
        assert_eq!(c.update(98), -2);
    }

    #[test]
    fn unwraps_16_bit_rollover() {
        let mut c = CountExtender::new(65_530);
        assert_eq!(c.update(4), 10);
        assert_eq!(c.update(65_528), -2);

        // Keep turning one way across several rollovers
        let mut raw: u16 = 0;
        c.set(raw, 0);
        for _ in 0..10 {
            raw = raw.wrapping_add(30_000);
            c.update(raw);
        }
        assert_eq!(c.count(), 300_000);
    }

    #[test]
    fn set_rezeros_position() {
        let mut c = CountExtender::new(0);
        c.update(1234);
        c.set(1234, 744);
        assert_eq!(c.update(1240), 750);
    }
}
