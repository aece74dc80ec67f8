use crate::agent::{Agent, AgentProfile, Species};
use crate::config::{SimConfig, SimConfigError};
use crate::food::{food_positions, FoodItem};
use crate::metrics::{
    collect_step_metrics, AgentSnapshot, PopulationStats, RunSummary, SnapshotFrame,
};
use crate::nav::Nav;
use crate::rng::{create_rng, derive_agent_rng, RandomSource};
use crate::spatial::{AnyIndex, SpatialIndex};
use glam::Vec3;
use rand_chacha::ChaCha12Rng;
use std::time::Instant;
use std::{error::Error, fmt};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub prune_us: u64,
    pub index_build_us: u64,
    pub agent_update_us: u64,
    pub total_us: u64,
}

/// Owns the agent arena, food, and spatial indices, and drives fixed-step ticks.
///
/// Agent slots are positions in `agents`; slots shift when dead agents are
/// pruned at the start of a tick, ids never do.
pub struct World {
    agents: Vec<Agent>,
    /// Per-agent random streams, aligned with `agents` slot for slot.
    agent_rngs: Vec<ChaCha12Rng>,
    food: Vec<FoodItem>,
    config: SimConfig,
    rng: ChaCha12Rng,
    agent_index: AnyIndex,
    food_index: AnyIndex,
    /// Pre-tick copy of every agent's nav; the only neighbor state agents read.
    nav_snapshot: Vec<Nav>,
    positions_buffer: Vec<Vec3>,
    next_agent_id: u32,
    step_index: usize,
    deaths_last_step: usize,
    total_deaths: usize,
    total_spawned: usize,
    lifespans: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    Spawn(SpawnError),
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::Spawn(e) => write!(f, "initial population: {}", e),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl From<SpawnError> for WorldInitError {
    fn from(err: SpawnError) -> Self {
        WorldInitError::Spawn(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            WorldInitError::Spawn(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    NonFinitePosition,
    NonFiniteFood,
    PopulationFull { max: usize },
    AgentIdExhausted,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::NonFinitePosition => {
                write!(f, "agent position and heading must be finite")
            }
            SpawnError::NonFiniteFood => write!(f, "food position and mass must be finite"),
            SpawnError::PopulationFull { max } => {
                write!(f, "population already at supported maximum ({max})")
            }
            SpawnError::AgentIdExhausted => write!(f, "agent id space exhausted"),
        }
    }
}

impl Error for SpawnError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
    TooManySnapshots { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
            ExperimentError::TooManySnapshots { max, actual } => {
                write!(
                    f,
                    "snapshot count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;
    pub const MAX_EXPERIMENT_SNAPSHOTS: usize = 1_000;

    /// Create an empty world (no agents, no food).
    pub fn new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        info!(
            seed = config.seed,
            world_size = config.world_size,
            backend = ?config.index_backend,
            "creating world"
        );
        Ok(Self {
            agents: Vec::new(),
            agent_rngs: Vec::new(),
            food: Vec::new(),
            rng: create_rng(config.seed),
            agent_index: AnyIndex::new(config.index_backend),
            food_index: AnyIndex::new(config.index_backend),
            nav_snapshot: Vec::new(),
            positions_buffer: Vec::new(),
            next_agent_id: 0,
            step_index: 0,
            deaths_last_step: 0,
            total_deaths: 0,
            total_spawned: 0,
            lifespans: Vec::new(),
            config,
        })
    }

    /// Create a world and spawn the configured prey and predators.
    pub fn populated(config: SimConfig) -> Result<Self, WorldInitError> {
        let mut world = Self::new(config)?;
        world.populate()?;
        Ok(world)
    }

    /// Spawn `num_prey` prey and `num_predators` predators at random positions
    /// inside the world with random headings.
    pub fn populate(&mut self) -> Result<(), SpawnError> {
        let plan = [
            (Species::Prey, self.config.num_prey),
            (Species::Predator, self.config.num_predators),
        ];
        for (species, count) in plan {
            for _ in 0..count {
                let position = self.random_position();
                let heading = self.random_heading();
                self.spawn(species, position, heading)?;
            }
        }
        info!(agents = self.agents.len(), "population seeded");
        Ok(())
    }

    fn random_position(&mut self) -> Vec3 {
        let size = self.config.world_size;
        Vec3::new(
            self.rng.uniform_signed(),
            self.rng.uniform_signed(),
            self.rng.uniform_signed(),
        ) * size
    }

    /// Uniformly distributed unit vector via rejection sampling in the unit ball.
    fn random_heading(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(
                self.rng.uniform_signed(),
                self.rng.uniform_signed(),
                self.rng.uniform_signed(),
            );
            let len_sq = v.length_squared();
            if len_sq > 1e-4 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
    }

    /// Spawn an agent using the configured profile for `species`. Returns its id.
    pub fn spawn(
        &mut self,
        species: Species,
        position: Vec3,
        heading: Vec3,
    ) -> Result<u32, SpawnError> {
        let profile = self.config.profile(species).clone();
        self.spawn_with_profile(&profile, position, heading)
    }

    pub fn spawn_with_profile(
        &mut self,
        profile: &AgentProfile,
        position: Vec3,
        heading: Vec3,
    ) -> Result<u32, SpawnError> {
        if !(position.is_finite() && heading.is_finite()) {
            return Err(SpawnError::NonFinitePosition);
        }
        if self.agents.len() >= SimConfig::MAX_TOTAL_AGENTS {
            return Err(SpawnError::PopulationFull {
                max: SimConfig::MAX_TOTAL_AGENTS,
            });
        }
        let id = self.next_agent_id;
        self.next_agent_id = id.checked_add(1).ok_or(SpawnError::AgentIdExhausted)?;
        let mut rng = derive_agent_rng(self.config.seed, id);
        let agent = Agent::from_profile(id, profile, Nav::facing(position, heading), &mut rng);
        self.agents.push(agent);
        self.agent_rngs.push(rng);
        self.total_spawned += 1;
        Ok(id)
    }

    /// Add a food item; it becomes visible to agents from the next tick. Returns its index.
    pub fn add_food(&mut self, item: FoodItem) -> Result<usize, SpawnError> {
        if !(item.position.is_finite() && item.mass.is_finite()) {
            return Err(SpawnError::NonFiniteFood);
        }
        self.food.push(item);
        Ok(self.food.len() - 1)
    }

    pub fn clear_food(&mut self) {
        self.food.clear();
    }

    pub fn food(&self) -> &[FoodItem] {
        &self.food
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, slot: usize) -> Option<&Agent> {
        self.agents.get(slot)
    }

    /// Mutable access for external tuning (fear, lifespan, ...) between ticks.
    pub fn agent_mut(&mut self, slot: usize) -> Option<&mut Agent> {
        self.agents.get_mut(slot)
    }

    pub fn find_agent(&self, id: u32) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the config; switching `index_backend` takes effect next tick.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), SimConfigError> {
        config.validate()?;
        if config.index_backend != self.agent_index.backend() {
            self.agent_index = AnyIndex::new(config.index_backend);
            self.food_index = AnyIndex::new(config.index_backend);
        }
        self.config = config;
        Ok(())
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }

    pub fn deaths_last_step(&self) -> usize {
        self.deaths_last_step
    }

    pub fn stats(&self) -> PopulationStats {
        let mut stats = PopulationStats {
            population_size: self.agents.len(),
            total_spawned: self.total_spawned,
            total_deaths: self.total_deaths,
            food_count: self.food.len(),
            ..PopulationStats::default()
        };
        for agent in self.agents.iter().filter(|a| a.alive) {
            stats.alive_count += 1;
            match agent.species {
                Species::Prey => stats.prey_count += 1,
                Species::Predator => stats.predator_count += 1,
            }
        }
        stats
    }

    /// Position/orientation of every agent for renderers.
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(AgentSnapshot::from).collect()
    }

    /// Advance one tick: prune the dead, snapshot navs, rebuild both indices,
    /// then run every live agent's sensing/foraging/aging/motion pass against
    /// the snapshot.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);

        let t0 = Instant::now();
        self.step_prune_phase();
        let prune_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.nav_snapshot.clear();
        self.nav_snapshot.extend(self.agents.iter().map(|a| a.nav));
        self.positions_buffer.clear();
        self.positions_buffer
            .extend(self.nav_snapshot.iter().map(|n| n.pos()));
        self.agent_index.rebuild(&self.positions_buffer);
        self.food_index.rebuild(&food_positions(&self.food));
        let index_build_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_agent_phase();
        let newly_dead = self.agents.iter().filter(|a| !a.alive).map(|a| a.age);
        let lifespans_before = self.lifespans.len();
        self.lifespans.extend(newly_dead);
        self.deaths_last_step = self.lifespans.len() - lifespans_before;
        self.total_deaths += self.deaths_last_step;
        if self.deaths_last_step > 0 {
            debug!(
                step = self.step_index,
                deaths = self.deaths_last_step,
                "agents reached end of lifespan"
            );
        }
        let agent_update_us = t2.elapsed().as_micros() as u64;

        StepTimings {
            prune_us,
            index_build_us,
            agent_update_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }

    pub fn run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        self.run_experiment_with_snapshots(steps, sample_every, 0)
    }

    /// Run `steps` ticks, sampling metrics every `sample_every` ticks (and on
    /// the last tick) and capturing full agent snapshots every
    /// `snapshot_every` ticks (0 disables snapshots).
    pub fn run_experiment_with_snapshots(
        &mut self,
        steps: usize,
        sample_every: usize,
        snapshot_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }
        let estimated_snapshots = if snapshot_every == 0 {
            0
        } else {
            steps / snapshot_every
        };
        if estimated_snapshots > Self::MAX_EXPERIMENT_SNAPSHOTS {
            return Err(ExperimentError::TooManySnapshots {
                max: Self::MAX_EXPERIMENT_SNAPSHOTS,
                actual: estimated_snapshots,
            });
        }

        self.lifespans.clear();
        let deaths_before = self.total_deaths;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut snapshots = Vec::with_capacity(estimated_snapshots);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(collect_step_metrics(
                    step,
                    self.deaths_last_step,
                    &self.agents,
                ));
            }
            if snapshot_every > 0 && step % snapshot_every == 0 {
                snapshots.push(SnapshotFrame {
                    step,
                    agents: self.snapshot(),
                });
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            final_alive_count: self.alive_count(),
            samples,
            lifespans: std::mem::take(&mut self.lifespans),
            total_deaths: self.total_deaths - deaths_before,
            snapshots,
        })
    }
}

mod phases;
