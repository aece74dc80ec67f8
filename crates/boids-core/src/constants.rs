/// Largest valid world half-extent (world units).
pub const MAX_WORLD_SIZE: f32 = 4096.0;

/// Multiplier applied to agent ids when deriving per-agent RNG seeds.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Upper bound on sampled prey lifespan.
pub const MAX_PREY_LIFESPAN: f32 = 300.0;
/// Upper bound on sampled predator lifespan.
pub const MAX_PREDATOR_LIFESPAN: f32 = 100.0;

/// Per-variant turn-rate factors applied to boundary and origin avoidance.
pub const MAX_PREY_TURN_RATE: f32 = 0.1;
pub const MAX_PREDATOR_TURN_RATE: f32 = 0.2;

/// Distance from a wall at which avoidance steering begins.
pub const DEFAULT_MIN_EDGE_PROXIMITY: f32 = 5.5;
/// Turn-rate factor for agents built without a variant profile.
pub const DEFAULT_TURN_RATE_FACTOR: f32 = 0.13;
/// Age added per tick before the fear multiplier.
pub const DEFAULT_AGE_RATE: f32 = 0.001;
