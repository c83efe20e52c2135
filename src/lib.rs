//! Synthetic population structure library
//!
//! Builds the relational substrate of a synthetic population for epidemic
//! modelling: families, work communities and overlapping friend groups over
//! a fixed range of node ids.

pub mod error;
pub mod population;
pub mod seeds;

pub use error::{AssignmentWarning, PopulationError, Result};
pub use population::{assemble_population, Population, PopulationConfig};
pub use seeds::PopulationSeeds;
