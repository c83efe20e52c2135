//! Error types for population generation.
//!
//! Hard failures (bad configuration, I/O) are `PopulationError`s and abort
//! assembly. Best-effort shortfalls are `AssignmentWarning`s that ride along
//! with the generated output instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::population::{Layer, NodeId};

/// Errors that abort population generation or persistence.
#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("node {node} already has a {layer} assignment")]
    ConflictingAssignment { node: NodeId, layer: Layer },

    #[error("node {node} is outside the population of {population_size}")]
    NodeOutOfRange { node: NodeId, population_size: u32 },

    #[error("save file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PopulationError {
    /// Shorthand for building an `InvalidConfiguration` error.
    pub fn config(msg: impl Into<String>) -> Self {
        PopulationError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PopulationError>;

/// Non-fatal shortfall reported by a generator alongside its partial output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentWarning {
    /// The friend-group iteration cap was reached before every target was met.
    FriendGroupsIncomplete {
        cohort: String,
        iterations: usize,
        unmet: usize,
    },
    /// A profession bracket left a remainder smaller than `min_size` unassigned.
    CommunityRemainder { cohort: String, unassigned: usize },
}

impl fmt::Display for AssignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentWarning::FriendGroupsIncomplete { cohort, iterations, unmet } => write!(
                f,
                "incomplete assignment in '{}': {} people under target after {} iterations",
                cohort, unmet, iterations
            ),
            AssignmentWarning::CommunityRemainder { cohort, unassigned } => write!(
                f,
                "incomplete assignment in '{}': {} people left without a work community",
                cohort, unassigned
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PopulationError::config("min_size cannot exceed max_size");
        assert_eq!(err.to_string(), "invalid configuration: min_size cannot exceed max_size");

        let err = PopulationError::ConflictingAssignment { node: 7, layer: Layer::Family };
        assert_eq!(err.to_string(), "node 7 already has a family assignment");
    }

    #[test]
    fn test_warning_display() {
        let warning = AssignmentWarning::CommunityRemainder {
            cohort: "A".to_string(),
            unassigned: 2,
        };
        assert!(warning.to_string().contains("2 people left"));
    }
}
