//! Randomization Engine.
//!
//! Pure routines over an injected random source: question and item
//! shuffling, weighted draws and branch resolution.

mod shuffle;
mod weighted;

pub use shuffle::shuffled_order;
pub use weighted::{select_branch, select_weighted, MAX_WEIGHT};

/// Random source owned by one engine or gateway instance.
pub type FlowRng = Box<dyn rand::RngCore + Send>;

/// Entropy-seeded random source for production use.
pub fn entropy_rng() -> FlowRng {
    use rand::SeedableRng;
    Box::new(rand::rngs::StdRng::from_entropy())
}
