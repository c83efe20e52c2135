//! Seed management for population generation
//!
//! Provides separate seeds for each randomized generator, and derives one
//! stream per cohort from them, so changing one bracket's parameters never
//! shifts the random draws of another.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::population::Layer;

/// Seeds for all population generators.
///
/// Each generator gets its own seed, derived from a master seed by default.
/// Individual seeds can be overridden for experimentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Friend-group formation (target shuffling, seeds, candidate sampling)
    pub friend_groups: u64,
    /// Work community partitioning (shuffle, chunk sizes)
    pub communities: u64,
}

impl PopulationSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            friend_groups: derive_seed(master, "friend_groups"),
            communities: derive_seed(master, "communities"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> PopulationSeedsBuilder {
        PopulationSeedsBuilder::new(master)
    }

    /// Base seed of a layer. Families draw no random numbers and use the master.
    pub fn layer_seed(&self, layer: Layer) -> u64 {
        match layer {
            Layer::Family => self.master,
            Layer::FriendGroup => self.friend_groups,
            Layer::Work => self.communities,
        }
    }

    /// Independent random stream for one generator run over one cohort.
    pub fn rng_for(&self, layer: Layer, cohort: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(derive_seed(self.layer_seed(layer), cohort))
    }
}

impl Default for PopulationSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct PopulationSeedsBuilder {
    seeds: PopulationSeeds,
}

impl PopulationSeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: PopulationSeeds::from_master(master),
        }
    }

    /// Override the friend-group seed
    pub fn friend_groups(mut self, seed: u64) -> Self {
        self.seeds.friend_groups = seed;
        self
    }

    /// Override the work community seed
    pub fn communities(mut self, seed: u64) -> Self {
        self.seeds.communities = seed;
        self
    }

    /// Build the final PopulationSeeds
    pub fn build(self) -> PopulationSeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a master seed and a system name.
///
/// Hashes the little-endian master seed followed by the name bytes with
/// BLAKE3 and keeps the first eight bytes, so saved seeds replay the same
/// streams on any platform and toolchain.
pub fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master.to_le_bytes());
    hasher.update(system.as_bytes());
    let mut first = [0u8; 8];
    first.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
    u64::from_le_bytes(first)
}

/// Display format for seeds (useful for sharing population configurations)
impl std::fmt::Display for PopulationSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PopulationSeeds {{ master: {}, friend_groups: {}, communities: {} }}",
            self.master, self.friend_groups, self.communities,
        )
    }
}
