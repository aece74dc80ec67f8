use crate::constants::RNG_DERIVATION_PRIME;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// Random draws consumed by the stochastic parts of steering.
///
/// Injected explicitly so runs are reproducible from a seed.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn uniform(&mut self) -> f32;
    /// Signed uniform sample in `[-1, 1]`.
    fn uniform_signed(&mut self) -> f32;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform(&mut self) -> f32 {
        self.random::<f32>()
    }

    fn uniform_signed(&mut self) -> f32 {
        self.random_range(-1.0f32..=1.0)
    }
}

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive a sub-RNG for a specific agent, ensuring independent streams.
pub fn derive_agent_rng(base_seed: u64, agent_id: u32) -> ChaCha12Rng {
    let offset = u64::from(agent_id).wrapping_mul(RNG_DERIVATION_PRIME);
    ChaCha12Rng::seed_from_u64(base_seed.wrapping_add(offset))
}
