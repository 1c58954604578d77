// --- File: universe.rs ---
use crate::config::SimulationConfig;
use crate::constants::{EAT_FLASH_COLOR, FIGHT_FLASH_COLOR, FOOD_COLOR, MATE_FLASH_COLOR};
use crate::genome::Genome;
use crate::organism::{Organism, OrganismKind};
use crate::registry::{IdServer, OrganismId, Registry};
use crate::utils::{drive_color, heading_vector, wrap_angle};
use crate::world::World;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type SimRng = StdRng;

/// Ephemeral visual record of an eat/fight/mate event. Consumed only by
/// the renderer; aged once per tick and dropped at zero.
#[derive(Debug, Clone)]
pub struct EventFlash {
    pub a: Vec3,
    pub b: Vec3,
    pub color: [f32; 3],
    pub frames_remaining: u32,
}

// One ranked percept candidate.
struct Seen {
    dist: f32,
    rel_angle: f32,
    color: [f32; 3],
}

/// The population controller: owns the world, the organism registry and
/// the per-tick resolution loop.
pub struct Universe {
    pub world: World,
    pub registry: Registry,
    pub config: SimulationConfig,
    pub flashes: Vec<EventFlash>,
    id_server: IdServer,
    rng: SimRng,
    tick: u64,
    // Reused per-tick buffers.
    live_buf: Vec<OrganismId>,
    food_buf: Vec<OrganismId>,
    percept_buf: Vec<f32>,
    seen_buf: Vec<Seen>,
}

impl Universe {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, SimRng::from_entropy())
    }

    /// Deterministic construction for tests and repeatable runs.
    pub fn seeded(config: SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, SimRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, rng: SimRng) -> Self {
        let mut universe = Self {
            world: World::new(config.world_extent),
            registry: Registry::new(),
            id_server: IdServer::new(),
            rng,
            flashes: Vec::new(),
            tick: 0,
            live_buf: Vec::new(),
            food_buf: Vec::new(),
            percept_buf: Vec::new(),
            seen_buf: Vec::new(),
            config,
        };
        // Initial population: live organisms start with a full stomach,
        // food items are just bodies waiting to be found.
        for _ in 0..universe.config.live_target {
            let position = universe.world.spawn_position(&mut universe.rng);
            let genome = Genome::random(&mut universe.rng);
            let id = universe.spawn_at(position, genome);
            if let Some(o) = universe.registry.get_mut(id) {
                let cap = o.energy.food_cap();
                o.energy.eat_food(cap);
            }
        }
        for _ in 0..universe.config.food_target {
            universe.spawn_food();
        }
        log::info!(
            "Init: {} live organisms, {} food items",
            universe.config.live_target,
            universe.config.food_target
        );
        universe
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// (live, food) population counts.
    pub fn counts(&self) -> (usize, usize) {
        let mut live = 0;
        let mut food = 0;
        for o in self.registry.iter() {
            match o.kind {
                OrganismKind::Live => live += 1,
                OrganismKind::Food => food += 1,
            }
        }
        (live, food)
    }

    /// Introduce a live organism with an empty stomach at a position.
    pub fn spawn_at(&mut self, position: Vec3, genome: Genome) -> OrganismId {
        let id = self.id_server.issue();
        let organism = Organism::new(id, position, genome, &self.config, &mut self.rng);
        self.registry.append(organism);
        id
    }

    fn spawn_live(&mut self) {
        let position = self.world.spawn_position(&mut self.rng);
        let genome = Genome::random(&mut self.rng);
        let id = self.spawn_at(position, genome);
        if let Some(o) = self.registry.get_mut(id) {
            let half = o.energy.food_cap() / 2.0;
            o.energy.eat_food(half);
        }
        log::info!("New organism {:?} joins the population", id);
    }

    fn spawn_food(&mut self) {
        let position = self.world.spawn_position(&mut self.rng);
        let genome = Genome::random(&mut self.rng);
        let id = self.spawn_at(position, genome);
        if let Some(o) = self.registry.get_mut(id) {
            o.become_food(self.config.decay_span);
            o.paint_as_food();
        }
        log::info!("More food: {:?}", id);
    }

    fn push_flash(&mut self, a: Vec3, b: Vec3, color: [f32; 3]) {
        self.flashes.push(EventFlash {
            a,
            b,
            color,
            frames_remaining: self.config.flash_frames,
        });
    }

    /// One simulation tick: maintenance, per-organism resolution in
    /// registry insertion order, flash aging. Interactions mutate the
    /// registry mid-tick, so later organisms observe earlier organisms'
    /// updated state; that ordering is part of the design.
    pub fn update(&mut self) {
        self.tick += 1;
        self.registry.compact();

        // Maintenance pass: cull non-finite positions, run food decay,
        // partition the survivors.
        self.live_buf.clear();
        self.food_buf.clear();
        self.registry.rewind();
        while let Some(id) = self.registry.next_id() {
            let Some(o) = self.registry.get_mut(id) else {
                continue;
            };
            if !o.position.is_finite() {
                log::warn!("organism {:?} has a non-finite position, removing", id);
                self.registry.remove(id);
                continue;
            }
            match o.kind {
                OrganismKind::Live => self.live_buf.push(id),
                OrganismKind::Food => {
                    if o.lifetick() {
                        self.food_buf.push(id);
                    } else {
                        log::info!(
                            "Decay! food {:?} spoiled after {} ticks",
                            id,
                            self.config.decay_span
                        );
                        self.registry.remove(id);
                    }
                }
            }
        }

        // Population floors: one replacement per tick, and only when a
        // positive target is configured (a zero target is a valid steady
        // state, not an error).
        if self.config.live_target > 0 && self.live_buf.len() < self.config.live_target {
            self.spawn_live();
        }
        if self.config.food_target > 0 && self.food_buf.len() < self.config.food_target {
            self.spawn_food();
        }

        // Per-organism resolution. Organisms spawned above are not in the
        // buffers and wait for the next tick, like everything else that
        // arrives mid-tick (children from mating included).
        let live_count = self.live_buf.len();
        let live_ids = std::mem::take(&mut self.live_buf);
        let food_ids = std::mem::take(&mut self.food_buf);
        for &id in &live_ids {
            let still_live =
                matches!(self.registry.get(id), Some(o) if o.kind == OrganismKind::Live);
            if still_live {
                self.update_organism(id, live_count, &food_ids);
                if let Some(o) = self.registry.get_mut(id) {
                    o.lifetick();
                }
            }
        }
        self.live_buf = live_ids;
        self.food_buf = food_ids;

        for flash in &mut self.flashes {
            flash.frames_remaining = flash.frames_remaining.saturating_sub(1);
        }
        self.flashes.retain(|f| f.frames_remaining > 0);
    }

    /// Build the percept vector for an organism into `percept_buf`:
    /// [random, health, food] followed by ranked 5-tuples
    /// [distance, relative angle, r, g, b] for organisms in the forward
    /// half-plane, then the same for food items with the fixed food color.
    fn build_percept(&mut self, id: OrganismId, food_ids: &[OrganismId]) {
        let Some(o) = self.registry.get(id) else {
            self.percept_buf.clear();
            return;
        };
        let own_pos = o.position;
        let own_heading = o.heading;
        let own_health = o.energy.health();
        let own_food = o.energy.food();
        let forward = o.forward();
        // Perceptual bandwidth is capped by the controller's fixed width.
        let width = o.brain.num_inputs();

        self.percept_buf.clear();
        self.percept_buf.push(self.rng.gen_range(-1.0..=1.0));
        self.percept_buf.push(own_health);
        self.percept_buf.push(own_food);

        // Everything else in front of us, closest first. The half-plane
        // dot test stands in for a field of view without any trig.
        self.seen_buf.clear();
        for t in self.registry.iter() {
            if t.id == id {
                continue;
            }
            let dv = t.position - own_pos;
            if dv.dot(forward) > 0.0 {
                self.seen_buf.push(Seen {
                    dist: dv.length(),
                    rel_angle: wrap_angle(dv.x.atan2(dv.z) - own_heading),
                    color: t.color,
                });
            }
        }
        self.seen_buf.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        for s in &self.seen_buf {
            if self.percept_buf.len() + 5 > width {
                break;
            }
            self.percept_buf
                .extend_from_slice(&[s.dist, s.rel_angle, s.color[0], s.color[1], s.color[2]]);
        }

        // Food gets a second, dedicated ranking with a fixed color so the
        // "food" signal is learnable regardless of what the item looks like.
        self.seen_buf.clear();
        for &fid in food_ids {
            let Some(f) = self.registry.get(fid) else {
                continue;
            };
            if f.kind != OrganismKind::Food {
                continue;
            }
            let dv = f.position - own_pos;
            if dv.dot(forward) > 0.0 {
                self.seen_buf.push(Seen {
                    dist: dv.length(),
                    rel_angle: wrap_angle(dv.x.atan2(dv.z) - own_heading),
                    color: FOOD_COLOR,
                });
            }
        }
        self.seen_buf.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        for s in &self.seen_buf {
            if self.percept_buf.len() + 5 > width {
                break;
            }
            self.percept_buf
                .extend_from_slice(&[s.dist, s.rel_angle, s.color[0], s.color[1], s.color[2]]);
        }
        // Unused slots stay zero; the brain pads on SetInputs.
    }

    /// Perception, inference, learning, action and interaction resolution
    /// for a single live organism.
    fn update_organism(&mut self, id: OrganismId, live_count: usize, food_ids: &[OrganismId]) {
        self.build_percept(id, food_ids);

        // --- Think, learn, act ---
        let alpha = self.config.alpha_coefficient;
        let out;
        {
            let Some(o) = self.registry.get_mut(id) else {
                return;
            };
            o.brain.set_inputs(&self.percept_buf);
            o.brain.run_net();
            let rate = o.genome.learning_rate();
            o.brain.learn(rate, alpha);
            out = [
                o.brain.output(0),
                o.brain.output(1),
                o.brain.output(2),
                o.brain.output(3),
            ];

            // Coarse integer-modulo discretization of the turn and speed
            // outputs, scaled by the genetic speed cap.
            let turn = ((out[1] as i32 % 20) / 10) as f32 * o.genome.max_speed();
            o.heading = wrap_angle(o.heading + turn);
            let step = o.genome.max_speed() * ((out[0] as i32 % 10) as f32 / 10.0) / 2.0;
            let displacement = heading_vector(out[1]) * step;
            let delta = self.world.clamp_delta(o.position, displacement);
            o.position += delta;

            // Coloration is a live readout of the drive signals: red for
            // aggression, blue for mating drive.
            o.color = [drive_color(out[3]), 0.0, drive_color(out[2])];
        }

        let (pos, size, reach, metabolism, food, food_cap) = {
            let Some(o) = self.registry.get(id) else {
                return;
            };
            (
                o.position,
                o.size,
                o.genome.reach(),
                o.genome.metabolism(),
                o.energy.food(),
                o.energy.food_cap(),
            )
        };

        // --- Eating: at most one food item per tick, skipped at cap ---
        if food < food_cap {
            let max_reach = self.config.max_reach;
            let mut eaten: Option<(OrganismId, Vec3, f32, f32)> = None;
            for &fid in food_ids {
                let Some(f) = self.registry.get(fid) else {
                    continue;
                };
                if f.kind != OrganismKind::Food {
                    continue;
                }
                let dv = f.position - pos;
                if dv.x.abs() - reach - size.x <= 0.0 && dv.z.abs() - reach - size.z <= 0.0 {
                    let amount =
                        (1.0 - reach / max_reach) * f.energy.health_cap() * (1.0 + metabolism);
                    eaten = Some((fid, f.position, f.size.y, amount));
                    break;
                }
            }
            if let Some((fid, f_pos, f_half_y, amount)) = eaten {
                self.registry.remove(fid);
                if let Some(o) = self.registry.get_mut(id) {
                    o.energy.eat_food(amount);
                    log::info!(
                        "Eat! {:?} gained {:.2} food ({:.2}/{:.2})",
                        id,
                        amount,
                        o.energy.food(),
                        o.energy.food_cap()
                    );
                }
                self.push_flash(
                    Vec3::new(pos.x, size.y, pos.z),
                    Vec3::new(f_pos.x, f_half_y, f_pos.z),
                    EAT_FLASH_COLOR,
                );
            }
        }

        // --- Fight or mate with the first in-range partner ---
        let mut partner: Option<(OrganismId, f32, f32)> = None;
        for t in self.registry.iter() {
            if t.id == id {
                continue;
            }
            let dv = t.position - pos;
            if dv.x.abs() - reach - size.x - t.size.x <= 0.0
                && dv.z.abs() - reach - size.z - t.size.z <= 0.0
            {
                partner = Some((t.id, t.brain.output(2), t.brain.output(3)));
                break;
            }
        }
        if let Some((pid, partner_mate, partner_fight)) = partner {
            let live_target = self.config.live_target as f32;
            let food_target = self.config.food_target as f32;
            let fight_threshold =
                self.config.fight_threshold * self.config.fight_threshold * live_target
                    / live_count as f32;
            let fight_product = out[3].abs() * partner_fight.abs();
            if fight_product > fight_threshold {
                self.fight(id, pid);
            } else if (live_count as f32) < live_target + 2.0 * food_target
                && out[2].abs() * partner_mate.abs()
                    > self.config.reproduction_threshold * live_count as f32 / live_target
            {
                self.mate(id, pid);
            }
            // Exactly one partner considered per tick, whatever came of it.
        }
    }

    /// Resolve an attack. Aborts without side effects when the attacker
    /// cannot pay the energy cost; a defender at zero health becomes food.
    fn fight(&mut self, attacker: OrganismId, defender: OrganismId) {
        if attacker == defender {
            return;
        }
        let (Some(a), Some(d)) = (self.registry.get(attacker), self.registry.get(defender))
        else {
            return;
        };
        if a.kind != OrganismKind::Live || d.kind != OrganismKind::Live {
            return;
        }

        // Shorter reach means harder hits; reach and power trade off.
        let max_reach = self.config.max_reach;
        let damage = self.config.damage_per_hit
            * a.genome.strength()
            * (max_reach - a.genome.reach())
            / max_reach;
        let cost = damage * self.config.energy_per_damage * a.genome.metabolism();

        let variance = a.genome.variance(&d.genome);
        log::debug!(
            "fight variance {:?} vs {:?}: {:.4}",
            attacker,
            defender,
            variance
        );
        if self.config.fight_variance_min > 0.0 && variance < self.config.fight_variance_min {
            return;
        }
        if a.energy.food() < cost {
            log::debug!(
                "fight blocked: {:?} has {:.2} food, needs {:.2}",
                attacker,
                a.energy.food(),
                cost
            );
            return;
        }

        let (a_pos, a_half_y) = (a.position, a.size.y);
        let (d_pos, d_half_y) = (d.position, d.size.y);

        if let Some(a) = self.registry.get_mut(attacker) {
            a.energy.use_energy(cost);
        }
        log::info!(
            "Attack! {:?} hits {:?} for {:.2} damage ({:.2} energy)",
            attacker,
            defender,
            damage,
            cost
        );
        self.push_flash(
            Vec3::new(a_pos.x, a_half_y, a_pos.z),
            Vec3::new(d_pos.x, d_half_y, d_pos.z),
            FIGHT_FLASH_COLOR,
        );
        let decay_span = self.config.decay_span;
        if let Some(d) = self.registry.get_mut(defender) {
            if !d.energy.take_damage(damage) {
                d.become_food(decay_span);
                log::info!(
                    "Kill! {:?} died at age {} and became food",
                    defender,
                    d.age()
                );
            }
        }
    }

    /// Resolve mating. Each parent pays half its energy-percent gene of
    /// its food cap; the child starts with the pooled spend.
    fn mate(&mut self, first: OrganismId, second: OrganismId) {
        if first == second {
            return;
        }
        let (Some(a), Some(b)) = (self.registry.get(first), self.registry.get(second)) else {
            return;
        };
        if a.kind != OrganismKind::Live || b.kind != OrganismKind::Live {
            return;
        }

        let a_spend = a.energy.food_cap() * a.genome.energy_pcnt() / 2.0;
        let b_spend = b.energy.food_cap() * b.genome.energy_pcnt() / 2.0;
        if a_spend > a.energy.food() || b_spend > b.energy.food() {
            return;
        }

        let variance = a.genome.variance(&b.genome);
        log::debug!("mate variance {:?} vs {:?}: {:.4}", first, second, variance);
        if self.config.mate_variance_min > 0.0 && variance < self.config.mate_variance_min {
            return;
        }

        let (a_pos, a_half_y, a_genome) = (a.position, a.size.y, a.genome);
        let (b_pos, b_half_y, b_genome) = (b.position, b.size.y, b.genome);

        if let Some(a) = self.registry.get_mut(first) {
            a.energy.use_energy(a_spend);
        }
        if let Some(b) = self.registry.get_mut(second) {
            b.energy.use_energy(b_spend);
        }

        let child_pos = Vec3::new(
            a_pos.x + self.rng.gen_range(-1.0..=1.0),
            0.0,
            b_pos.z + self.rng.gen_range(-1.0..=1.0),
        );
        let genome = Genome::crossover(&a_genome, &b_genome, &mut self.rng);
        let child = self.spawn_at(child_pos, genome);
        if let Some(c) = self.registry.get_mut(child) {
            c.energy.eat_food(a_spend + b_spend);
        }
        log::info!(
            "Mate! {:?} and {:?} produced {:?} (spent {:.2} + {:.2})",
            first,
            second,
            child,
            a_spend,
            b_spend
        );
        self.push_flash(
            Vec3::new(a_pos.x, a_half_y, a_pos.z),
            Vec3::new(b_pos.x, b_half_y, b_pos.z),
            MATE_FLASH_COLOR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_brain_config() -> SimulationConfig {
        SimulationConfig {
            brain_inputs: 13,
            ..SimulationConfig::default()
        }
    }

    // Reach 2.5, strength 1, metabolism 0.5: damage 5, cost 1.25, and
    // every derived quantity is exactly representable in f32.
    fn fighter_genome() -> Genome {
        Genome::from_genes([0.5, 0.5, 0.5, 0.1, 2.5, 0.5, 1.0, 0.05, 0.0001])
    }

    // Minimal-footprint genome: zero reach, slowest legal speed.
    fn hermit_genome() -> Genome {
        Genome::from_genes([0.2, 0.2, 0.2, 0.1, 0.0, 0.0, 0.1, 0.05, 0.0001])
    }

    fn live_ids(u: &Universe) -> Vec<OrganismId> {
        u.registry
            .iter()
            .filter(|o| o.kind == OrganismKind::Live)
            .map(|o| o.id)
            .collect()
    }

    fn food_ids(u: &Universe) -> Vec<OrganismId> {
        u.registry
            .iter()
            .filter(|o| o.kind == OrganismKind::Food)
            .map(|o| o.id)
            .collect()
    }

    // Wire input 1 (own health) straight to one output with weight 10 and
    // silence everything else, so the chosen drive is large and constant.
    fn force_drive(u: &mut Universe, id: OrganismId, output: usize) {
        let inputs = u.config.brain_inputs;
        let outputs = u.config.brain_outputs;
        let o = u.registry.get_mut(id).unwrap();
        for i in 0..inputs {
            for j in 0..outputs {
                o.brain.set_weight(i, j, 0.0);
            }
        }
        o.brain.set_weight(1, output, 10.0);
    }

    #[test]
    fn decay_and_respawn_scenario() {
        let config = SimulationConfig {
            live_target: 1,
            food_target: 1,
            decay_span: 100,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 42);
        let lone = live_ids(&u)[0];
        let original_food = food_ids(&u)[0];

        // Pin the scenario: a hermit far away from the food item.
        {
            let o = u.registry.get_mut(lone).unwrap();
            o.genome = hermit_genome();
            o.size = o.genome.size();
            o.position = Vec3::new(-25.0, 0.0, -25.0);
        }
        {
            let f = u.registry.get_mut(original_food).unwrap();
            f.position = Vec3::new(25.0, 0.0, 25.0);
        }
        let starting_food = u.registry.get(lone).unwrap().energy.food();

        for _ in 0..99 {
            u.update();
        }
        assert!(u.registry.contains(original_food), "food decayed early");

        u.update();
        assert!(!u.registry.contains(original_food), "food should spoil at tick 100");
        let (live, food) = u.counts();
        assert_eq!((live, food), (1, 1), "replacement food should spawn");
        assert_ne!(food_ids(&u)[0], original_food);

        for _ in 0..50 {
            u.update();
        }
        // No interaction ever fires, so the organism's energy only ever
        // moves through eat/fight/mate -- i.e. not at all.
        let o = u.registry.get(lone).unwrap();
        assert_eq!(o.energy.food(), starting_food);
        assert_eq!(o.energy.health(), o.energy.health_cap());
    }

    #[test]
    fn colocated_organisms_fight_per_threshold() {
        let config = SimulationConfig {
            live_target: 2,
            food_target: 0,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 7);
        let ids = live_ids(&u);
        let (a, b) = (ids[0], ids[1]);
        for &id in &[a, b] {
            let o = u.registry.get_mut(id).unwrap();
            o.genome = fighter_genome();
            o.size = o.genome.size();
            o.position = Vec3::ZERO;
        }
        force_drive(&mut u, a, 3);
        force_drive(&mut u, b, 3);

        // Tick 1: a's outputs are fresh but b's are still zero when a
        // scans, so only b (which sees a's fresh outputs) attacks.
        u.update();
        let oa = u.registry.get(a).unwrap();
        let ob = u.registry.get(b).unwrap();
        // damage = 10 * 1.0 * (5 - 2.5)/5 = 5; cost = 5 * 0.5 * 0.5 = 1.25.
        assert_eq!(oa.energy.health(), oa.energy.health_cap() - 5.0);
        assert_eq!(oa.energy.food(), oa.energy.food_cap());
        assert_eq!(ob.energy.health(), ob.energy.health_cap());
        assert_eq!(ob.energy.food(), ob.energy.food_cap() - 1.25);
        let fight_flashes: Vec<_> = u
            .flashes
            .iter()
            .filter(|f| f.color == FIGHT_FLASH_COLOR)
            .collect();
        assert_eq!(fight_flashes.len(), 1);

        // Tick 2: both drives are hot, both strike.
        u.update();
        let oa = u.registry.get(a).unwrap();
        let ob = u.registry.get(b).unwrap();
        assert_eq!(oa.energy.health(), oa.energy.health_cap() - 10.0);
        assert_eq!(ob.energy.health(), ob.energy.health_cap() - 5.0);
    }

    #[test]
    fn colocated_organisms_mate_per_threshold() {
        let config = SimulationConfig {
            live_target: 2,
            food_target: 1,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 11);
        let ids = live_ids(&u);
        let (a, b) = (ids[0], ids[1]);
        for &id in &[a, b] {
            let o = u.registry.get_mut(id).unwrap();
            o.genome = fighter_genome();
            o.size = o.genome.size();
            o.position = Vec3::new(20.0, 0.0, 20.0);
        }
        // Park the food far from the couple so nobody eats mid-test.
        let food = food_ids(&u)[0];
        u.registry.get_mut(food).unwrap().position = Vec3::new(-28.0, 0.0, -28.0);
        force_drive(&mut u, a, 2);
        force_drive(&mut u, b, 2);

        // The second organism processed sees the first one's fresh
        // outputs, so mating already fires on the first tick:
        // 2 < 2 + 2*1 and the drive product dwarfs the threshold.
        u.update();
        let (live, _) = u.counts();
        assert_eq!(live, 3, "a child should have been born");

        let child = live_ids(&u)
            .into_iter()
            .find(|id| *id != a && *id != b)
            .unwrap();
        let spend = 100.0 * 0.05 / 2.0; // food_cap * energy_pcnt / 2
        let child_org = u.registry.get(child).unwrap();
        assert_eq!(child_org.energy.food(), 2.0 * spend);
        assert!(u.flashes.iter().any(|f| f.color == MATE_FLASH_COLOR));
    }

    #[test]
    fn fight_is_a_noop_without_energy() {
        let config = SimulationConfig {
            live_target: 2,
            food_target: 0,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 3);
        let ids = live_ids(&u);
        let (a, b) = (ids[0], ids[1]);
        for &id in &[a, b] {
            let o = u.registry.get_mut(id).unwrap();
            o.genome = fighter_genome();
        }
        // Drain the attacker below the 1.25 energy cost.
        u.registry.get_mut(a).unwrap().energy.use_energy(99.0);
        let before_b = u.registry.get(b).unwrap().energy.health();
        let before_a = u.registry.get(a).unwrap().energy.food();

        u.fight(a, b);
        assert_eq!(u.registry.get(b).unwrap().energy.health(), before_b);
        assert_eq!(u.registry.get(a).unwrap().energy.food(), before_a);
        assert!(u.flashes.is_empty());
    }

    #[test]
    fn mate_conserves_energy_and_issues_fresh_id() {
        let config = SimulationConfig {
            live_target: 2,
            food_target: 0,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 5);
        let ids = live_ids(&u);
        let (a, b) = (ids[0], ids[1]);
        for &id in &[a, b] {
            u.registry.get_mut(id).unwrap().genome = fighter_genome();
        }
        let a_before = u.registry.get(a).unwrap().energy.food();
        let b_before = u.registry.get(b).unwrap().energy.food();

        u.mate(a, b);
        let spend = 100.0 * 0.05 / 2.0;
        assert_eq!(u.registry.get(a).unwrap().energy.food(), a_before - spend);
        assert_eq!(u.registry.get(b).unwrap().energy.food(), b_before - spend);

        let child = live_ids(&u)
            .into_iter()
            .find(|id| *id != a && *id != b)
            .expect("child exists");
        assert!(child > a && child > b, "child id must be fresh");
        assert_eq!(u.registry.get(child).unwrap().energy.food(), 2.0 * spend);

        // A destitute parent aborts the whole thing.
        let count_before = u.registry.len();
        u.registry.get_mut(a).unwrap().energy.use_energy(1000.0);
        u.mate(a, b);
        assert_eq!(u.registry.len(), count_before);
        assert_eq!(u.registry.get(b).unwrap().energy.food(), b_before - spend);
    }

    #[test]
    fn percept_is_half_plane_filtered_and_distance_sorted() {
        let config = SimulationConfig {
            live_target: 0,
            food_target: 0,
            brain_inputs: 28,
            ..SimulationConfig::default()
        };
        let mut u = Universe::seeded(config, 1);
        let me = u.spawn_at(Vec3::ZERO, hermit_genome());
        // Heading 0 faces +z. Ahead at 5, ahead at 1, behind, and exactly
        // sideways (dot == 0, excluded by the strict test).
        let far = u.spawn_at(Vec3::new(3.0, 0.0, 4.0), hermit_genome());
        let near = u.spawn_at(Vec3::new(0.0, 0.0, 1.0), hermit_genome());
        let behind = u.spawn_at(Vec3::new(0.0, 0.0, -5.0), hermit_genome());
        let side = u.spawn_at(Vec3::new(5.0, 0.0, 0.0), hermit_genome());
        u.registry.get_mut(far).unwrap().color = [0.1, 0.2, 0.3];
        u.registry.get_mut(near).unwrap().color = [0.4, 0.5, 0.6];
        u.registry.get_mut(behind).unwrap().color = [0.9, 0.9, 0.9];
        u.registry.get_mut(side).unwrap().color = [0.8, 0.8, 0.8];

        u.build_percept(me, &[]);
        let p = u.percept_buf.clone();
        // 3 self inputs + two visible organisms, nothing else.
        assert_eq!(p.len(), 3 + 2 * 5);
        assert!((p[3] - 1.0).abs() < 1e-5, "nearest first");
        assert_eq!(&p[5..8], &[0.4, 0.5, 0.6]);
        assert!((p[8] - 5.0).abs() < 1e-5);
        assert_eq!(&p[10..13], &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn food_percept_uses_fixed_color() {
        let config = SimulationConfig {
            live_target: 0,
            food_target: 0,
            brain_inputs: 28,
            ..SimulationConfig::default()
        };
        let mut u = Universe::seeded(config, 1);
        let me = u.spawn_at(Vec3::ZERO, hermit_genome());
        let snack = u.spawn_at(Vec3::new(0.0, 0.0, 2.0), hermit_genome());
        {
            let f = u.registry.get_mut(snack).unwrap();
            f.become_food(100);
            f.color = [0.2, 0.2, 0.2]; // stored color must not leak through
        }

        u.build_percept(me, &[snack]);
        let p = u.percept_buf.clone();
        // The item shows up twice: once as a ranked organism with its own
        // color, once in the food list with the forced signal color.
        assert_eq!(p.len(), 3 + 5 + 5);
        assert_eq!(&p[5..8], &[0.2, 0.2, 0.2]);
        assert_eq!(&p[10..13], &FOOD_COLOR);
    }

    #[test]
    fn eating_transfers_capped_energy_and_removes_food() {
        let config = SimulationConfig {
            live_target: 1,
            food_target: 1,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 13);
        let eater = live_ids(&u)[0];
        let snack = food_ids(&u)[0];
        {
            let o = u.registry.get_mut(eater).unwrap();
            o.genome = fighter_genome();
            o.size = o.genome.size();
            o.position = Vec3::ZERO;
            o.energy.use_energy(60.0); // leave room below the cap
        }
        u.registry.get_mut(snack).unwrap().position = Vec3::new(0.5, 0.0, 0.5);
        let before = u.registry.get(eater).unwrap().energy.food();

        u.update();
        assert!(!u.registry.contains(snack), "food item should be consumed");
        let o = u.registry.get(eater).unwrap();
        // amount = (1 - 2.5/5) * 100 * 1.5 = 75, saturating at the cap.
        let expected = (before + 75.0).min(o.energy.food_cap());
        assert_eq!(o.energy.food(), expected);
        assert!(u.flashes.iter().any(|f| f.color == EAT_FLASH_COLOR));
    }

    #[test]
    fn energy_bounds_hold_over_many_ticks() {
        let config = SimulationConfig {
            live_target: 6,
            food_target: 8,
            world_extent: Vec3::new(20.0, 4.0, 20.0),
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 99);
        for _ in 0..60 {
            u.update();
            for o in u.registry.iter() {
                assert!(o.energy.food() >= 0.0 && o.energy.food() <= o.energy.food_cap());
                assert!(o.energy.health() >= 0.0 && o.energy.health() <= o.energy.health_cap());
                assert!(o.position.is_finite());
            }
        }
    }

    #[test]
    fn zero_targets_spawn_nothing() {
        let config = SimulationConfig {
            live_target: 0,
            food_target: 0,
            ..small_brain_config()
        };
        let mut u = Universe::seeded(config, 17);
        for _ in 0..10 {
            u.update();
        }
        assert_eq!(u.counts(), (0, 0));
    }
}
