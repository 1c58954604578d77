use crate::constants::DRIVE_COLOR_SCALE;
use glam::Vec3;
use std::f32::consts::PI;

// --- Helper Functions ---

/// Wrap an angle into [-PI, PI].
pub fn wrap_angle(mut angle: f32) -> f32 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector in the XZ plane for a heading angle.
#[inline]
pub fn heading_vector(angle: f32) -> Vec3 {
    Vec3::new(angle.sin(), 0.0, angle.cos())
}

/// Squash an unbounded drive output into a [0, 1] color channel.
pub fn drive_color(raw: f32) -> f32 {
    (((raw.abs() / DRIVE_COLOR_SCALE).tanh() + 1.0) / 2.0).min(1.0)
}
