//! Population structure generation
//!
//! Partitions a fixed range of node ids into families, work communities
//! and overlapping friend groups, then assembles them into one read-only
//! `Population` for the epidemic model to consume.

pub mod assembler;
pub mod builder;
pub mod cohorts;
pub mod communities;
pub mod config;
pub mod families;
pub mod friend_groups;
pub mod network;
pub mod persistence;
pub mod validation;

use std::fmt;
use serde::{Serialize, Deserialize};

pub use assembler::assemble_population;
pub use cohorts::{CohortIndex, CohortRange, Dimension};
pub use config::PopulationConfig;
pub use network::{Population, PersonRecord};

/// Node identifier, in `[0, population_size)`.
pub type NodeId = u32;

// =============================================================================
// ID TYPES
// =============================================================================

/// Macro to generate newtype ID wrappers with common derives and Display.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of this id in its group collection.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Shift the id by the number of groups produced before it.
            pub fn offset(self, by: usize) -> Self {
                $name(self.0 + by as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(FamilyId);
define_id!(CommunityId);
define_id!(FriendGroupId);

// =============================================================================
// LAYERS
// =============================================================================

/// One of the three relational layers of the population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Family,
    FriendGroup,
    Work,
}

impl Layer {
    pub fn all() -> &'static [Layer] {
        &[Layer::Family, Layer::FriendGroup, Layer::Work]
    }

    /// Short label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            Layer::Family => "family",
            Layer::FriendGroup => "friend",
            Layer::Work => "work",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
