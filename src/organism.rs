// --- File: organism.rs ---
use crate::brain::Brain;
use crate::config::SimulationConfig;
use crate::constants::FOOD_COLOR;
use crate::genome::Genome;
use crate::registry::OrganismId;
use crate::universe::SimRng;
use crate::utils::heading_vector;
use glam::Vec3;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrganismKind {
    Live,
    Food,
}

/// Bounded food/health pair. Food funds actions; health reaching zero
/// kills the organism (the universe retypes it to food).
#[derive(Debug, Clone)]
pub struct Energy {
    food: f32,
    food_cap: f32,
    health: f32,
    health_cap: f32,
}

impl Energy {
    pub fn new(food_cap: f32, health_cap: f32) -> Self {
        Self {
            food: 0.0,
            food_cap,
            health: health_cap,
            health_cap,
        }
    }

    #[inline]
    pub fn food(&self) -> f32 {
        self.food
    }

    #[inline]
    pub fn food_cap(&self) -> f32 {
        self.food_cap
    }

    #[inline]
    pub fn health(&self) -> f32 {
        self.health
    }

    #[inline]
    pub fn health_cap(&self) -> f32 {
        self.health_cap
    }

    /// Add food, saturating at the cap.
    pub fn eat_food(&mut self, amount: f32) {
        self.food = (self.food + amount).clamp(0.0, self.food_cap);
    }

    /// Spend food, flooring at zero. Callers check affordability first.
    pub fn use_energy(&mut self, amount: f32) {
        self.food = (self.food - amount).max(0.0);
    }

    /// Apply damage; returns false once health is exhausted.
    pub fn take_damage(&mut self, damage: f32) -> bool {
        self.health = (self.health - damage).max(0.0);
        self.health > 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Organism {
    pub id: OrganismId,
    pub kind: OrganismKind,
    pub genome: Genome,
    pub brain: Brain,
    pub energy: Energy,
    pub position: Vec3,
    /// Heading angle in radians about the vertical axis.
    pub heading: f32,
    pub color: [f32; 3],
    /// Body half-extents, fixed from the genome at birth.
    pub size: Vec3,
    /// Ticks lived while LIVE; remaining ticks before spoilage while FOOD.
    age: u64,
    decay_left: u32,
}

impl Organism {
    /// A live organism with an empty stomach at the given position.
    pub fn new(
        id: OrganismId,
        position: Vec3,
        genome: Genome,
        config: &SimulationConfig,
        rng: &mut SimRng,
    ) -> Self {
        Self {
            id,
            kind: OrganismKind::Live,
            brain: Brain::new(config.brain_inputs, config.brain_outputs, rng),
            energy: Energy::new(config.food_cap, config.health_cap),
            position,
            heading: 0.0,
            color: [0.0, 0.0, 0.0],
            size: genome.size(),
            age: 0,
            decay_left: config.decay_span,
            genome,
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        heading_vector(self.heading)
    }

    /// Retype to food. The decay clock restarts; the body keeps its last
    /// coloration so corpses stay distinguishable from spawned food.
    pub fn become_food(&mut self, decay_span: u32) {
        self.kind = OrganismKind::Food;
        self.decay_left = decay_span;
    }

    /// Paint with the fixed food signal color (used for spawned food).
    pub fn paint_as_food(&mut self) {
        self.color = FOOD_COLOR;
    }

    /// Advance the aging counter. For live organisms this only counts up;
    /// for food it runs the decay clock and returns false on spoilage.
    pub fn lifetick(&mut self) -> bool {
        self.age += 1;
        match self.kind {
            OrganismKind::Live => true,
            OrganismKind::Food => {
                self.decay_left = self.decay_left.saturating_sub(1);
                self.decay_left > 0
            }
        }
    }

    #[inline]
    pub fn age(&self) -> u64 {
        self.age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_organism(config: &SimulationConfig) -> Organism {
        let mut rng = SimRng::seed_from_u64(11);
        let genome = Genome::random(&mut rng);
        Organism::new(OrganismId::test_value(1), Vec3::ZERO, genome, config, &mut rng)
    }

    #[test]
    fn energy_respects_caps() {
        let mut e = Energy::new(100.0, 50.0);
        e.eat_food(250.0);
        assert_eq!(e.food(), 100.0);
        e.use_energy(40.0);
        assert_eq!(e.food(), 60.0);
        e.use_energy(1000.0);
        assert_eq!(e.food(), 0.0);
        assert!(e.take_damage(49.0));
        assert_eq!(e.health(), 1.0);
        assert!(!e.take_damage(10.0));
        assert_eq!(e.health(), 0.0);
    }

    #[test]
    fn live_lifetick_never_expires() {
        let config = SimulationConfig {
            decay_span: 2,
            ..SimulationConfig::default()
        };
        let mut o = test_organism(&config);
        for _ in 0..10 {
            assert!(o.lifetick());
        }
        assert_eq!(o.age(), 10);
    }

    #[test]
    fn food_decays_after_span() {
        let config = SimulationConfig {
            decay_span: 3,
            ..SimulationConfig::default()
        };
        let mut o = test_organism(&config);
        o.become_food(config.decay_span);
        assert!(o.lifetick());
        assert!(o.lifetick());
        assert!(!o.lifetick());
    }

    #[test]
    fn forward_tracks_heading() {
        let config = SimulationConfig::default();
        let mut o = test_organism(&config);
        o.heading = 0.0;
        assert!((o.forward() - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
        o.heading = std::f32::consts::FRAC_PI_2;
        assert!((o.forward() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }
}
