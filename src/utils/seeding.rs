//! Per-unit RNG seeding
//!
//! Each simulation unit gets its own `StdRng` whose seed mixes the run's
//! base seed with the unit's coordinates, so units can run in any order
//! (or be recomputed alone) and still draw the same numbers.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Stream tags keep the cascade, shared-prey and chain draws independent
pub const CASCADE_STREAM: u64 = 1;
pub const SHARED_PREY_STREAM: u64 = 2;
pub const CHAIN_STREAM: u64 = 3;

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

pub fn derive_seed(base: u64, coordinates: &[u64]) -> u64 {
    coordinates
        .iter()
        .fold(splitmix64(base), |acc, &c| splitmix64(acc ^ splitmix64(c)))
}

pub fn unit_rng(base: u64, coordinates: &[u64]) -> StdRng {
    StdRng::seed_from_u64(derive_seed(base, coordinates))
}
