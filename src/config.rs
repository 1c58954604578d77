// --- File: config.rs ---
use crate::constants::{EVENT_FLASH_FRAMES, MAX_REACH};
use glam::Vec3;

/// Immutable tunables handed to [`crate::universe::Universe`] at
/// construction. Zero population targets are valid steady states (no
/// respawning happens), not configuration errors.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// World extents; x is width, z is depth, y only matters to the camera.
    pub world_extent: Vec3,
    /// Live-population floor: spawn one fresh organism per tick while the
    /// live count is below this.
    pub live_target: usize,
    /// Food floor, maintained the same way.
    pub food_target: usize,
    /// Ticks a food item lasts before it spoils and is removed.
    pub decay_span: u32,
    /// Upper bound on the reach gene; the damage and eating formulas
    /// divide by it.
    pub max_reach: f32,
    pub fight_threshold: f32,
    pub reproduction_threshold: f32,
    pub damage_per_hit: f32,
    pub energy_per_damage: f32,
    /// Percept width of every brain; fixed for a controller's lifetime.
    pub brain_inputs: usize,
    pub brain_outputs: usize,
    /// Global plasticity coefficient multiplied into each organism's own
    /// heritable learning-rate gene.
    pub alpha_coefficient: f32,
    pub food_cap: f32,
    pub health_cap: f32,
    /// Minimum genetic variance required to mate. 0.0 disables the gate;
    /// near-identical genomes are then only logged, never blocked.
    pub mate_variance_min: f32,
    /// Same policy switch for fights.
    pub fight_variance_min: f32,
    pub flash_frames: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world_extent: Vec3::new(60.0, 4.0, 60.0),
            live_target: 12,
            food_target: 20,
            decay_span: 600,
            max_reach: MAX_REACH,
            fight_threshold: 1.0,
            reproduction_threshold: 1.0,
            damage_per_hit: 10.0,
            energy_per_damage: 0.5,
            // 3 self inputs + five 5-tuples of ranked organisms/food.
            brain_inputs: 28,
            brain_outputs: 4,
            alpha_coefficient: 0.1,
            food_cap: 100.0,
            health_cap: 100.0,
            mate_variance_min: 0.0,
            fight_variance_min: 0.0,
            flash_frames: EVENT_FLASH_FRAMES,
        }
    }
}
