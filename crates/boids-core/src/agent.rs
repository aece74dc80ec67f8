use crate::config::BehaviorParams;
use crate::constants::{
    DEFAULT_AGE_RATE, DEFAULT_MIN_EDGE_PROXIMITY, DEFAULT_TURN_RATE_FACTOR,
    MAX_PREDATOR_LIFESPAN, MAX_PREDATOR_TURN_RATE, MAX_PREY_LIFESPAN, MAX_PREY_TURN_RATE,
};
use crate::food::FoodItem;
use crate::nav::Nav;
use crate::rng::RandomSource;
use crate::spatial::SpatialIndex;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Neighbors closer than this are treated as coincident and exert no separation force.
pub const MIN_SEPARATION_DISTANCE: f32 = 1e-5;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    #[default]
    Prey,
    Predator,
}

/// Data-driven variant parameters applied when an agent is spawned.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentProfile {
    pub species: Species,
    /// Lifespan is sampled uniformly from `[min_lifespan, max_lifespan]`.
    pub min_lifespan: f32,
    pub max_lifespan: f32,
    pub age_rate: f32,
    pub min_edge_proximity: f32,
    pub turn_rate_factor: f32,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self::prey()
    }
}

impl AgentProfile {
    pub fn prey() -> Self {
        Self {
            species: Species::Prey,
            min_lifespan: 1.0,
            max_lifespan: MAX_PREY_LIFESPAN,
            age_rate: DEFAULT_AGE_RATE,
            min_edge_proximity: DEFAULT_MIN_EDGE_PROXIMITY,
            turn_rate_factor: MAX_PREY_TURN_RATE,
        }
    }

    pub fn predator() -> Self {
        Self {
            species: Species::Predator,
            min_lifespan: 1.0,
            max_lifespan: MAX_PREDATOR_LIFESPAN,
            age_rate: DEFAULT_AGE_RATE,
            min_edge_proximity: DEFAULT_MIN_EDGE_PROXIMITY,
            turn_rate_factor: MAX_PREDATOR_TURN_RATE,
        }
    }

    pub fn sample_lifespan<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f32 {
        self.min_lifespan + (self.max_lifespan - self.min_lifespan) * rng.uniform()
    }
}

/// A single boid: navigation state plus lifecycle attributes.
///
/// Agents only ever mutate themselves. Neighbor state arrives as an immutable
/// `&[Nav]` snapshot taken before the tick started.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    /// Stable identifier; independent of the agent's slot in the world arena.
    pub id: u32,
    pub species: Species,
    pub nav: Nav,
    /// Last point passed to `seek`.
    pub target: Vec3,
    pub alive: bool,
    pub hunger: f32,
    pub fear: f32,
    pub mutation: f32,
    pub mutation_rate: f32,
    pub age: f32,
    pub age_rate: f32,
    pub lifespan: f32,
    /// Wall distance at which avoidance steering begins.
    pub min_edge_proximity: f32,
    pub turn_rate_factor: f32,
}

impl Agent {
    pub fn new(id: u32, nav: Nav, lifespan: f32) -> Self {
        Self {
            id,
            species: Species::Prey,
            nav,
            target: Vec3::ZERO,
            alive: true,
            hunger: 1.0,
            fear: 0.0,
            mutation: 0.0,
            mutation_rate: 0.0,
            age: 0.0,
            age_rate: DEFAULT_AGE_RATE,
            lifespan,
            min_edge_proximity: DEFAULT_MIN_EDGE_PROXIMITY,
            turn_rate_factor: DEFAULT_TURN_RATE_FACTOR,
        }
    }

    pub fn from_profile<R: RandomSource + ?Sized>(
        id: u32,
        profile: &AgentProfile,
        nav: Nav,
        rng: &mut R,
    ) -> Self {
        Self {
            species: profile.species,
            age_rate: profile.age_rate,
            min_edge_proximity: profile.min_edge_proximity,
            turn_rate_factor: profile.turn_rate_factor,
            ..Self::new(id, nav, profile.sample_lifespan(rng))
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Sense neighbors and apply every steering rule for one tick.
    ///
    /// The candidate list is the raw region query, so it contains this agent's
    /// own entry in `navs`: its heading counts toward alignment, while cohesion
    /// and separation never act on it (distance 0). Rules run in a fixed
    /// order, each compounding on the orientation left by the previous one:
    /// alignment, cohesion, separation, boundary avoidance, origin avoidance.
    pub fn detect_surroundings<I, R>(
        &mut self,
        index: &I,
        world_size: f32,
        navs: &[Nav],
        params: &BehaviorParams,
        rng: &mut R,
    ) where
        I: SpatialIndex + ?Sized,
        R: RandomSource + ?Sized,
    {
        let candidates =
            index.query_region(self.nav.pos(), Vec3::splat(params.neighbor_half_extent));

        self.alignment(navs, &candidates, params);
        self.cohesion(navs, &candidates, params);
        self.separation(navs, &candidates, params);

        let effective_size = world_size * params.boundary_scale;
        self.handle_boundary(effective_size, params.bounce_threshold, rng);
        self.origin_avoidance(effective_size, params.origin_radius);
    }

    /// Steer toward the average heading of neighbors within `alignment_radius`.
    /// Returns whether a turn was applied.
    pub fn alignment(
        &mut self,
        navs: &[Nav],
        candidates: &[usize],
        params: &BehaviorParams,
    ) -> bool {
        let pos = self.nav.pos();
        let mut heading = Vec3::ZERO;
        let mut count = 0usize;
        for other in candidates.iter().filter_map(|&i| navs.get(i)) {
            if pos.distance(other.pos()) < params.alignment_radius {
                heading += other.uf();
                count += 1;
            }
        }
        if count == 0 {
            return false;
        }
        heading /= count as f32;
        // Opposing headings can cancel exactly; there is nothing to align to then.
        let Some(direction) = heading.try_normalize() else {
            return false;
        };
        self.nav
            .face_toward(pos + direction, Vec3::Y, params.alignment_strength);
        true
    }

    /// Steer away from neighbors within `separation_radius`, weighted by inverse distance.
    /// Coincident neighbors are skipped rather than divided by zero.
    pub fn separation(
        &mut self,
        navs: &[Nav],
        candidates: &[usize],
        params: &BehaviorParams,
    ) -> bool {
        let pos = self.nav.pos();
        let mut force = Vec3::ZERO;
        let mut count = 0usize;
        for other in candidates.iter().filter_map(|&i| navs.get(i)) {
            let away = pos - other.pos();
            let dist = away.length();
            if dist >= params.separation_radius || dist < MIN_SEPARATION_DISTANCE {
                continue;
            }
            force += away / (dist * dist);
            count += 1;
        }
        if count == 0 {
            return false;
        }
        force /= count as f32;
        self.nav
            .face_toward(pos + force, Vec3::Y, params.separation_strength);
        true
    }

    /// Steer toward the centroid of neighbors strictly farther than
    /// `cohesion_min_distance`. Nearby flock-mates do not pull.
    pub fn cohesion(
        &mut self,
        navs: &[Nav],
        candidates: &[usize],
        params: &BehaviorParams,
    ) -> bool {
        let pos = self.nav.pos();
        let mut centroid = Vec3::ZERO;
        let mut count = 0usize;
        for other in candidates.iter().filter_map(|&i| navs.get(i)) {
            if pos.distance(other.pos()) > params.cohesion_min_distance {
                centroid += other.pos();
                count += 1;
            }
        }
        if count == 0 {
            return false;
        }
        centroid /= count as f32;
        let turn = (pos.distance(centroid) / params.cohesion_distance_divisor)
            .min(params.cohesion_max_turn);
        self.nav.face_toward(centroid, Vec3::Y, turn);
        true
    }

    /// Turn away from any wall closer than `min_edge_proximity`, axis by axis.
    ///
    /// `size` is the half-extent of the avoidance box. Inside `bounce_threshold`
    /// of a wall the orientation is additionally perturbed at random so agents
    /// do not glide along it.
    pub fn handle_boundary<R: RandomSource + ?Sized>(
        &mut self,
        size: f32,
        bounce_threshold: f32,
        rng: &mut R,
    ) {
        for axis in 0..3 {
            let pos = self.nav.pos();
            let coord = pos[axis];
            let dist = (coord - size).abs().min((coord + size).abs());
            if dist >= self.min_edge_proximity {
                continue;
            }
            let proximity = (size - dist) / size;
            let mut mirror = pos;
            mirror[axis] = -coord;
            let up = self.nav.uu();
            self.nav
                .face_toward(mirror, up, self.turn_rate_factor * proximity);
            if dist < bounce_threshold {
                self.bounce(axis, rng);
            }
        }
    }

    /// Overwrite the quaternion component for `axis` and the scalar part with
    /// random draws, then renormalize.
    fn bounce<R: RandomSource + ?Sized>(&mut self, axis: usize, rng: &mut R) {
        let [x, y, z, w] = self.nav.quat().to_array();
        let applied = match axis {
            0 => {
                let nx = rng.uniform_signed();
                let nw = rng.uniform_signed();
                self.nav.set_quat(nx, y, z, nw)
            }
            1 => {
                let ny = rng.uniform();
                let nw = rng.uniform_signed();
                self.nav.set_quat(x, ny, z, nw)
            }
            _ => {
                let nz = rng.uniform_signed();
                let nw = rng.uniform_signed();
                self.nav.set_quat(x, y, nz, nw)
            }
        };
        if !applied {
            tracing::trace!(id = self.id, axis, "bounce skipped: degenerate quaternion");
        }
    }

    /// Turn away from the world origin when within `origin_radius` of it.
    pub fn origin_avoidance(&mut self, size: f32, origin_radius: f32) {
        let pos = self.nav.pos();
        let dist = pos.length();
        if dist < origin_radius {
            let turn = self.turn_rate_factor * (1.0 - dist / size);
            let up = self.nav.uu();
            self.nav.face_toward(-pos, up, turn);
        }
    }

    /// Seek the heaviest food item within `world_size` (per axis) of the agent.
    /// Ties go to the lowest food index. Returns the chosen food index.
    pub fn find_food<I: SpatialIndex + ?Sized>(
        &mut self,
        index: &I,
        world_size: f32,
        food: &[FoodItem],
        params: &BehaviorParams,
    ) -> Option<usize> {
        let candidates = index.query_region(self.nav.pos(), Vec3::splat(world_size));
        let mut best: Option<(usize, &FoodItem)> = None;
        for (i, item) in candidates.iter().filter_map(|&i| food.get(i).map(|f| (i, f))) {
            match best {
                Some((_, current)) if item.mass <= current.mass => {}
                _ => best = Some((i, item)),
            }
        }
        let (chosen, item) = best?;
        self.seek(item.position, params.food_strength, params.seek_smoothing);
        Some(chosen)
    }

    /// Record `target`, set velocity smoothing, and turn toward it with world-up.
    pub fn seek(&mut self, target: Vec3, amount: f32, smoothing: f32) {
        self.target = target;
        self.nav.smooth(smoothing);
        self.nav.face_toward(target, Vec3::Y, amount);
    }

    /// Age one tick; past `lifespan` the agent dies and stays dead.
    pub fn update_params(&mut self) {
        if !self.alive {
            return;
        }
        if self.age > self.lifespan {
            self.alive = false;
            return;
        }
        self.age += self.age_rate + self.age_rate * self.fear;
    }

    pub fn update_position(&mut self, speed: f32, dt: f32) {
        self.nav.move_f(speed);
        self.nav.step(dt);
    }
}
