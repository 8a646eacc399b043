//! Boom telemetry frame, little-endian, sent once per telemetry tick.
//!
//! [0xAA 0x55] [yaw i32] [pitch i32] [x f32] [y f32] [dx f32] [dy f32]
//! [ax f32] [ay f32] [az f32] [temp i32]

pub const FRAME_HEADER: [u8; 2] = [0xAA, 0x55];
pub const FRAME_LEN: usize = 2 + 4 * 10;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct TelemetryFrame {
    pub yaw_count: i32,   // counts
    pub pitch_count: i32, // counts
    pub x: f32,           // m
    pub y: f32,           // m
    pub dx: f32,          // m/s
    pub dy: f32,          // m/s
    pub accel: [f32; 3],  // g, boom frame
    pub temperature: i32, // raw sensor units
}

impl TelemetryFrame {
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0..2].copy_from_slice(&FRAME_HEADER);
        buf[2..6].copy_from_slice(&self.yaw_count.to_le_bytes());
        buf[6..10].copy_from_slice(&self.pitch_count.to_le_bytes());
        buf[10..14].copy_from_slice(&self.x.to_le_bytes());
        buf[14..18].copy_from_slice(&self.y.to_le_bytes());
        buf[18..22].copy_from_slice(&self.dx.to_le_bytes());
        buf[22..26].copy_from_slice(&self.dy.to_le_bytes());
        buf[26..30].copy_from_slice(&self.accel[0].to_le_bytes());
        buf[30..34].copy_from_slice(&self.accel[1].to_le_bytes());
        buf[34..38].copy_from_slice(&self.accel[2].to_le_bytes());
        buf[38..42].copy_from_slice(&self.temperature.to_le_bytes());
        buf
    }

    /// Parses one frame. `None` on a short buffer or a bad header.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < FRAME_LEN || buf[0..2] != FRAME_HEADER {
            return None;
        }
        let word = |at: usize| [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]];
        Some(Self {
            yaw_count: i32::from_le_bytes(word(2)),
            pitch_count: i32::from_le_bytes(word(6)),
            x: f32::from_le_bytes(word(10)),
            y: f32::from_le_bytes(word(14)),
            dx: f32::from_le_bytes(word(18)),
            dy: f32::from_le_bytes(word(22)),
            accel: [
                f32::from_le_bytes(word(26)),
                f32::from_le_bytes(word(30)),
                f32::from_le_bytes(word(34)),
            ],
            temperature: i32::from_le_bytes(word(38)),
        })
    }
}

/// Byte-oriented output for encoded frames.
#[allow(async_fn_in_trait)]
pub trait FrameSink {
    type Error;

    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_fixed_little_endian() {
        let frame = TelemetryFrame {
            yaw_count: -2,
            pitch_count: 844,
            x: 1.0,
            y: -0.5,
            dx: 0.0,
            dy: 2.0,
            accel: [0.0, 1.0, 0.0],
            temperature: 0x0102_0304,
        };
        let buf = frame.encode();

        assert_eq!(buf.len(), 42);
        assert_eq!(&buf[0..2], &[0xAA, 0x55]);
        assert_eq!(&buf[2..6], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&buf[6..10], &[0x4C, 0x03, 0x00, 0x00]);
        assert_eq!(&buf[10..14], &1.0f32.to_le_bytes());
        assert_eq!(&buf[30..34], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&buf[38..42], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn decode_reads_back_fields() {
        let frame = TelemetryFrame {
            yaw_count: 12,
            pitch_count: 744,
            x: 0.25,
            y: 0.75,
            dx: -1.5,
            dy: 3.0,
            accel: [0.1, -0.2, 0.3],
            temperature: -40,
        };
        assert_eq!(TelemetryFrame::decode(&frame.encode()), Some(frame));
    }

    #[test]
    fn decode_rejects_bad_header_and_short_buffer() {
        let mut buf = TelemetryFrame::default().encode();
        assert!(TelemetryFrame::decode(&buf[..FRAME_LEN - 1]).is_none());
        buf[1] = 0x56;
        assert!(TelemetryFrame::decode(&buf).is_none());
    }
}
