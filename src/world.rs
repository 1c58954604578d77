// --- File: world.rs ---
use crate::constants::CAMERA_EYE_HEIGHT;
use crate::universe::SimRng;
use glam::Vec3;
use rand::Rng;

/// Bounded planar region plus the free-camera pose. The pose only feeds
/// the rendering transform; simulation logic never reads it.
#[derive(Debug, Clone)]
pub struct World {
    extent: Vec3,
    pub camera_pos: Vec3,
    pub camera_yaw: f32,
}

impl World {
    pub fn new(extent: Vec3) -> Self {
        Self {
            extent,
            camera_pos: Vec3::new(0.0, CAMERA_EYE_HEIGHT, extent.z * 0.7),
            camera_yaw: 0.0,
        }
    }

    #[inline]
    pub fn half_extent(&self) -> Vec3 {
        self.extent / 2.0
    }

    /// Uniform random position on the floor.
    pub fn spawn_position(&self, rng: &mut SimRng) -> Vec3 {
        let half = self.half_extent();
        Vec3::new(
            rng.gen_range(-half.x..=half.x),
            0.0,
            rng.gen_range(-half.z..=half.z),
        )
    }

    /// Trim a proposed displacement so `position + delta` stays inside the
    /// bounds on both horizontal axes.
    pub fn clamp_delta(&self, position: Vec3, mut delta: Vec3) -> Vec3 {
        let half = self.half_extent();
        if position.x + delta.x > half.x {
            delta.x = half.x - position.x;
        }
        if position.x + delta.x < -half.x {
            delta.x = -half.x - position.x;
        }
        if position.z + delta.z > half.z {
            delta.z = half.z - position.z;
        }
        if position.z + delta.z < -half.z {
            delta.z = -half.z - position.z;
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn world() -> World {
        World::new(Vec3::new(20.0, 4.0, 10.0))
    }

    #[test]
    fn spawn_positions_are_in_bounds() {
        let w = world();
        let mut rng = SimRng::seed_from_u64(1);
        for _ in 0..200 {
            let p = w.spawn_position(&mut rng);
            assert!(p.x.abs() <= 10.0 && p.z.abs() <= 5.0);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn in_bounds_displacement_is_untouched() {
        let w = world();
        let d = w.clamp_delta(Vec3::ZERO, Vec3::new(1.0, 0.0, -2.0));
        assert_eq!(d, Vec3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn displacement_is_trimmed_at_the_edge() {
        let w = world();
        let pos = Vec3::new(9.0, 0.0, 4.0);
        let d = w.clamp_delta(pos, Vec3::new(5.0, 0.0, 5.0));
        assert_eq!(pos + d, Vec3::new(10.0, 0.0, 5.0));

        let pos = Vec3::new(-9.5, 0.0, -4.5);
        let d = w.clamp_delta(pos, Vec3::new(-3.0, 0.0, -3.0));
        assert_eq!(pos + d, Vec3::new(-10.0, 0.0, -5.0));
    }
}
