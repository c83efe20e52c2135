//! Cohort range index.
//!
//! Static mapping of contiguous node-id ranges to named cohorts along two
//! dimensions (age and profession). Ranges are validated once when the
//! index is built; lookups afterwards cannot fail.

use std::fmt;
use std::ops::RangeInclusive;
use serde::{Serialize, Deserialize};

use crate::error::{PopulationError, Result};
use super::NodeId;

/// Dimension a cohort range belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Age,
    Profession,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Age => f.write_str("age"),
            Dimension::Profession => f.write_str("profession"),
        }
    }
}

/// A named, inclusive block of node ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortRange {
    pub name: String,
    pub start: NodeId,
    pub end: NodeId,
}

impl CohortRange {
    pub fn new(name: impl Into<String>, start: NodeId, end: NodeId) -> Self {
        Self { name: name.into(), start, end }
    }

    /// Number of ids in the range (0 if `start > end`).
    pub fn len(&self) -> usize {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.start <= node && node <= self.end
    }

    pub fn ids(&self) -> RangeInclusive<NodeId> {
        self.start..=self.end
    }

    pub fn overlaps(&self, other: &CohortRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Lookup from node id to age and profession cohort.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CohortIndex {
    population_size: u32,
    age: Vec<CohortRange>,
    profession: Vec<CohortRange>,
}

impl CohortIndex {
    /// Build and validate an index.
    ///
    /// Age ranges must tile `[0, population_size)` exactly. Profession ranges
    /// must be disjoint and inside the population but may leave gaps.
    pub fn new(
        population_size: u32,
        age: Vec<CohortRange>,
        profession: Vec<CohortRange>,
    ) -> Result<Self> {
        if population_size == 0 {
            return Err(PopulationError::config("population_size must be positive"));
        }
        let age = sorted_disjoint(Dimension::Age, age, population_size)?;
        let profession = sorted_disjoint(Dimension::Profession, profession, population_size)?;

        let mut expected_start = 0;
        for range in &age {
            if range.start != expected_start {
                return Err(PopulationError::config(format!(
                    "age cohorts leave ids {}..{} uncovered",
                    expected_start, range.start
                )));
            }
            expected_start = range.end + 1;
        }
        if expected_start != population_size {
            return Err(PopulationError::config(format!(
                "age cohorts leave ids {}..{} uncovered",
                expected_start, population_size
            )));
        }

        Ok(Self { population_size, age, profession })
    }

    pub fn population_size(&self) -> u32 {
        self.population_size
    }

    pub fn ranges(&self, dimension: Dimension) -> &[CohortRange] {
        match dimension {
            Dimension::Age => &self.age,
            Dimension::Profession => &self.profession,
        }
    }

    /// Range of a cohort by name.
    pub fn range(&self, dimension: Dimension, name: &str) -> Option<&CohortRange> {
        self.ranges(dimension).iter().find(|r| r.name == name)
    }

    /// Name of the cohort containing `node`, or `None` if uncovered.
    pub fn cohort_of(&self, node: NodeId, dimension: Dimension) -> Option<&str> {
        let ranges = self.ranges(dimension);
        let idx = ranges.partition_point(|r| r.end < node);
        ranges
            .get(idx)
            .filter(|r| r.contains(node))
            .map(|r| r.name.as_str())
    }

    pub fn age_of(&self, node: NodeId) -> Option<&str> {
        self.cohort_of(node, Dimension::Age)
    }

    pub fn profession_of(&self, node: NodeId) -> Option<&str> {
        self.cohort_of(node, Dimension::Profession)
    }
}

/// Sort ranges by start and reject malformed, duplicate or overlapping ones.
fn sorted_disjoint(
    dimension: Dimension,
    mut ranges: Vec<CohortRange>,
    population_size: u32,
) -> Result<Vec<CohortRange>> {
    for (i, range) in ranges.iter().enumerate() {
        if range.start > range.end {
            return Err(PopulationError::config(format!(
                "{} cohort '{}' has start {} after end {}",
                dimension, range.name, range.start, range.end
            )));
        }
        if range.end >= population_size {
            return Err(PopulationError::config(format!(
                "{} cohort '{}' ends at {} outside population of {}",
                dimension, range.name, range.end, population_size
            )));
        }
        if ranges[..i].iter().any(|r| r.name == range.name) {
            return Err(PopulationError::config(format!(
                "duplicate {} cohort '{}'",
                dimension, range.name
            )));
        }
    }

    ranges.sort_by_key(|r| r.start);
    for pair in ranges.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(PopulationError::config(format!(
                "{} cohorts '{}' and '{}' overlap",
                dimension, pair[0].name, pair[1].name
            )));
        }
    }
    Ok(ranges)
}
