use core::f32::consts::PI;

use crate::config::Geometry;

/// Encoder counts → joint angle (rad). Also used for counts/s → rad/s.
pub fn counts_to_radians(counts: f32, geometry: &Geometry) -> f32 {
    (counts / geometry.counts_per_rev()) * 2.0 * PI
}

/// Joint angle (rad) → encoder counts.
pub fn radians_to_counts(radians: f32, geometry: &Geometry) -> f32 {
    radians / (2.0 * PI) * geometry.counts_per_rev()
}

impl Geometry {
    /// Boom-end horizontal travel (m or m/s) from yaw counts (or counts/s).
    pub fn yaw_linear(&self, counts: f32) -> f32 {
        counts_to_radians(counts, self) * self.yaw_radius_m
    }

    /// Boom-end vertical travel (m or m/s) from pitch counts (or counts/s).
    pub fn pitch_linear(&self, counts: f32) -> f32 {
        counts_to_radians(counts, self) * self.pitch_radius_m
    }
}
