pub mod agent;
pub mod config;
pub mod constants;
pub mod food;
pub mod metrics;
pub mod nav;
pub mod octree;
pub mod rng;
pub mod spatial;
pub mod world;

pub use agent::{Agent, AgentProfile, Species};
pub use config::{BehaviorParams, SimConfig, SimConfigError};
pub use constants::MAX_WORLD_SIZE;
pub use food::FoodItem;
pub use metrics::{AgentSnapshot, PopulationStats, RunSummary, SnapshotFrame, StepMetrics};
pub use nav::Nav;
pub use spatial::{IndexBackend, SpatialIndex};
pub use world::World;
