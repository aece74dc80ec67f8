use crate::agent::{Agent, Species};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub alive_count: usize,
    pub prey_count: usize,
    pub predator_count: usize,
    pub death_count: usize,
    pub mean_age: f32,
    pub mean_speed: f32,
    /// Length of the mean forward vector: 1.0 when every agent heads the same way.
    pub polarization: f32,
    /// Mean distance from the flock centroid.
    pub spread: f32,
    pub centroid: [f32; 3],
}

/// Per-agent state handed to renderers each frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub id: u32,
    pub species: Species,
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub up: [f32; 3],
    pub age: f32,
    pub alive: bool,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            species: agent.species,
            position: agent.nav.pos().to_array(),
            forward: agent.nav.uf().to_array(),
            up: agent.nav.uu().to_array(),
            age: agent.age,
            alive: agent.alive,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotFrame {
    pub step: usize,
    pub agents: Vec<AgentSnapshot>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub final_alive_count: usize,
    pub samples: Vec<StepMetrics>,
    /// Age reached by each agent that died during the run.
    #[serde(default)]
    pub lifespans: Vec<f32>,
    #[serde(default)]
    pub total_deaths: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<SnapshotFrame>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PopulationStats {
    pub population_size: usize,
    pub alive_count: usize,
    pub prey_count: usize,
    pub predator_count: usize,
    pub total_spawned: usize,
    pub total_deaths: usize,
    pub food_count: usize,
}

pub(crate) fn collect_step_metrics(
    step: usize,
    death_count: usize,
    agents: &[Agent],
) -> StepMetrics {
    let alive: Vec<&Agent> = agents.iter().filter(|a| a.alive).collect();
    let mut metrics = StepMetrics {
        step,
        alive_count: alive.len(),
        death_count,
        ..StepMetrics::default()
    };
    if alive.is_empty() {
        return metrics;
    }
    let n = alive.len() as f32;
    let mut heading_sum = Vec3::ZERO;
    let mut position_sum = Vec3::ZERO;
    let mut age_sum = 0.0f32;
    let mut speed_sum = 0.0f32;
    for agent in &alive {
        match agent.species {
            Species::Prey => metrics.prey_count += 1,
            Species::Predator => metrics.predator_count += 1,
        }
        heading_sum += agent.nav.uf();
        position_sum += agent.nav.pos();
        age_sum += agent.age;
        speed_sum += agent.nav.velocity().abs();
    }
    let centroid = position_sum / n;
    metrics.mean_age = age_sum / n;
    metrics.mean_speed = speed_sum / n;
    metrics.polarization = (heading_sum / n).length();
    metrics.spread = alive
        .iter()
        .map(|a| a.nav.pos().distance(centroid))
        .sum::<f32>()
        / n;
    metrics.centroid = centroid.to_array();
    metrics
}
