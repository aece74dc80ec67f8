use crate::agent::{AgentProfile, Species};
use crate::spatial::IndexBackend;
use serde::{Deserialize, Serialize};

/// Radii, strengths and thresholds used by the per-agent steering pass.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorParams {
    /// Half-extent of the cube queried around each agent for flock-mates.
    pub neighbor_half_extent: f32,
    /// Neighbors closer than this contribute to alignment.
    pub alignment_radius: f32,
    /// Turn amount applied toward the averaged heading.
    pub alignment_strength: f32,
    /// Neighbors closer than this push the agent away.
    pub separation_radius: f32,
    /// Turn amount applied toward the averaged repulsion.
    pub separation_strength: f32,
    /// Only neighbors strictly farther than this pull the agent inward.
    pub cohesion_min_distance: f32,
    /// Distance to the centroid is divided by this to get the turn amount.
    pub cohesion_distance_divisor: f32,
    /// Cap on the cohesion turn amount.
    pub cohesion_max_turn: f32,
    /// World size multiplier for boundary and origin avoidance.
    pub boundary_scale: f32,
    /// Wall distance below which orientation is randomly perturbed.
    pub bounce_threshold: f32,
    /// Distance from the origin below which the agent turns away from it.
    pub origin_radius: f32,
    /// Turn amount applied toward the heaviest food item in range.
    pub food_strength: f32,
    /// Velocity smoothing set on the nav each time the agent seeks.
    pub seek_smoothing: f32,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            neighbor_half_extent: 5.0,
            alignment_radius: 5.0,
            alignment_strength: 0.2,
            separation_radius: 1.5,
            separation_strength: 0.75,
            cohesion_min_distance: 3.5,
            cohesion_distance_divisor: 10.0,
            cohesion_max_turn: 0.75,
            boundary_scale: 1.1667,
            bounce_threshold: 0.15,
            origin_radius: 0.25,
            food_strength: 0.1,
            seek_smoothing: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Half-extent of the cubic world; agents live in `[-world_size, world_size]^3`.
    pub world_size: f32,
    /// Simulation timestep passed to motion integration.
    pub dt: f32,
    /// Forward speed requested from every agent each tick.
    pub speed: f32,
    /// Prey spawned by `World::populate`.
    pub num_prey: usize,
    /// Predators spawned by `World::populate`.
    pub num_predators: usize,
    /// Spatial index implementation used for agents and food.
    pub index_backend: IndexBackend,
    /// Variant parameters for prey.
    pub prey: AgentProfile,
    /// Variant parameters for predators.
    pub predator: AgentProfile,
    pub behavior: BehaviorParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            world_size: 25.0,
            dt: 1.0 / 60.0,
            speed: 2.0,
            num_prey: 200,
            num_predators: 10,
            index_backend: IndexBackend::Octree,
            prey: AgentProfile::prey(),
            predator: AgentProfile::predator(),
            behavior: BehaviorParams::default(),
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidWorldSize => "world_size must be positive and finite";
    WorldSizeTooLarge { max: f32, actual: f32 } => "world_size ({actual}) exceeds supported maximum ({max})";
    InvalidDt => "dt must be positive and finite";
    InvalidSpeed => "speed must be finite and non-negative";
    TooManyAgents { max: usize, actual: usize } => "Too many agents: {} > max {}", actual, max;
    InvalidLifespanRange { species: Species } => "{species:?} lifespan range must be finite, positive, and ordered";
    InvalidAgeRate { species: Species } => "{species:?} age_rate must be finite and non-negative";
    InvalidEdgeProximity { species: Species } => "{species:?} min_edge_proximity must be finite and non-negative";
    InvalidTurnRateFactor { species: Species } => "{species:?} turn_rate_factor must be finite and within [0,1]";
    ProfileSpeciesMismatch { expected: Species, actual: Species } => "profile for {expected:?} is tagged {actual:?}";
    InvalidBehaviorRadius { name: &'static str } => "behavior.{name} must be finite and non-negative";
    InvalidBehaviorStrength { name: &'static str } => "behavior.{name} must be finite and within [0,1]";
    InvalidCohesionDivisor => "behavior.cohesion_distance_divisor must be finite and positive";
    InvalidBoundaryScale => "behavior.boundary_scale must be finite and positive";
    InvalidSeekSmoothing => "behavior.seek_smoothing must be finite and within [0,1)";
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub const MAX_WORLD_SIZE: f32 = crate::constants::MAX_WORLD_SIZE;

    pub const MAX_TOTAL_AGENTS: usize = 100_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_world()?;
        self.validate_population()?;
        self.validate_profile(&self.prey, Species::Prey)?;
        self.validate_profile(&self.predator, Species::Predator)?;
        self.validate_behavior()?;
        Ok(())
    }

    /// Profile used when spawning agents of `species`.
    pub fn profile(&self, species: Species) -> &AgentProfile {
        match species {
            Species::Prey => &self.prey,
            Species::Predator => &self.predator,
        }
    }

    fn validate_world(&self) -> Result<(), SimConfigError> {
        if !(self.world_size.is_finite() && self.world_size > 0.0) {
            return Err(SimConfigError::InvalidWorldSize);
        }
        if self.world_size > Self::MAX_WORLD_SIZE {
            return Err(SimConfigError::WorldSizeTooLarge {
                max: Self::MAX_WORLD_SIZE,
                actual: self.world_size,
            });
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimConfigError::InvalidDt);
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(SimConfigError::InvalidSpeed);
        }
        Ok(())
    }

    fn validate_population(&self) -> Result<(), SimConfigError> {
        let total = self.num_prey.saturating_add(self.num_predators);
        if total > Self::MAX_TOTAL_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_TOTAL_AGENTS,
                actual: total,
            });
        }
        Ok(())
    }

    fn validate_profile(
        &self,
        profile: &AgentProfile,
        species: Species,
    ) -> Result<(), SimConfigError> {
        if profile.species != species {
            return Err(SimConfigError::ProfileSpeciesMismatch {
                expected: species,
                actual: profile.species,
            });
        }
        if !(profile.min_lifespan.is_finite()
            && profile.max_lifespan.is_finite()
            && profile.min_lifespan > 0.0
            && profile.min_lifespan <= profile.max_lifespan)
        {
            return Err(SimConfigError::InvalidLifespanRange { species });
        }
        if !(profile.age_rate.is_finite() && profile.age_rate >= 0.0) {
            return Err(SimConfigError::InvalidAgeRate { species });
        }
        if !(profile.min_edge_proximity.is_finite() && profile.min_edge_proximity >= 0.0) {
            return Err(SimConfigError::InvalidEdgeProximity { species });
        }
        if !(profile.turn_rate_factor.is_finite()
            && (0.0..=1.0).contains(&profile.turn_rate_factor))
        {
            return Err(SimConfigError::InvalidTurnRateFactor { species });
        }
        Ok(())
    }

    fn validate_behavior(&self) -> Result<(), SimConfigError> {
        let b = &self.behavior;
        for (name, value) in [
            ("neighbor_half_extent", b.neighbor_half_extent),
            ("alignment_radius", b.alignment_radius),
            ("separation_radius", b.separation_radius),
            ("cohesion_min_distance", b.cohesion_min_distance),
            ("bounce_threshold", b.bounce_threshold),
            ("origin_radius", b.origin_radius),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimConfigError::InvalidBehaviorRadius { name });
            }
        }
        for (name, value) in [
            ("alignment_strength", b.alignment_strength),
            ("separation_strength", b.separation_strength),
            ("cohesion_max_turn", b.cohesion_max_turn),
            ("food_strength", b.food_strength),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(SimConfigError::InvalidBehaviorStrength { name });
            }
        }
        if !(b.cohesion_distance_divisor.is_finite() && b.cohesion_distance_divisor > 0.0) {
            return Err(SimConfigError::InvalidCohesionDivisor);
        }
        if !(b.boundary_scale.is_finite() && b.boundary_scale > 0.0) {
            return Err(SimConfigError::InvalidBoundaryScale);
        }
        if !(b.seek_smoothing.is_finite() && (0.0..1.0).contains(&b.seek_smoothing)) {
            return Err(SimConfigError::InvalidSeekSmoothing);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_world_size() {
        let config = SimConfig {
            world_size: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidWorldSize));
    }

    #[test]
    fn rejects_excessive_world_size() {
        let config = SimConfig {
            world_size: SimConfig::MAX_WORLD_SIZE * 2.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::WorldSizeTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_nan_dt() {
        let config = SimConfig {
            dt: f32::NAN,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidDt));
    }

    #[test]
    fn rejects_population_over_cap() {
        let config = SimConfig {
            num_prey: SimConfig::MAX_TOTAL_AGENTS,
            num_predators: 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::TooManyAgents { .. })
        ));
    }

    #[test]
    fn rejects_inverted_lifespan_range() {
        let mut config = SimConfig::default();
        config.predator.min_lifespan = config.predator.max_lifespan + 1.0;
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidLifespanRange {
                species: Species::Predator
            })
        );
    }

    #[test]
    fn rejects_profile_in_wrong_slot() {
        let config = SimConfig {
            prey: AgentProfile::predator(),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::ProfileSpeciesMismatch { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_strength() {
        let mut config = SimConfig::default();
        config.behavior.separation_strength = 1.5;
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidBehaviorStrength {
                name: "separation_strength"
            })
        );
    }

    #[test]
    fn error_messages_name_the_field() {
        let err = SimConfigError::InvalidBehaviorRadius {
            name: "alignment_radius",
        };
        assert_eq!(
            err.to_string(),
            "behavior.alignment_radius must be finite and non-negative"
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "seed": 7, "behavior": { "alignment_radius": 4.0 } }"#)
                .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.behavior.alignment_radius, 4.0);
        assert_eq!(config.behavior.separation_radius, 1.5);
        assert_eq!(config.index_backend, IndexBackend::Octree);
    }
}
