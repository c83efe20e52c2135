//! Configuration for population generation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::error::{PopulationError, Result};
use super::cohorts::{CohortIndex, CohortRange, Dimension};
use super::friend_groups::PairingRule;

/// Members a family draws from one age cohort, by family-index parity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySlot {
    pub cohort: String,
    /// Members taken by even-indexed families.
    pub even: u32,
    /// Members taken by odd-indexed families.
    pub odd: u32,
}

impl FamilySlot {
    pub fn new(cohort: impl Into<String>, even: u32, odd: u32) -> Self {
        Self { cohort: cohort.into(), even, odd }
    }

    /// Members taken by the family at `family_index`.
    pub fn count_for(&self, family_index: usize) -> u32 {
        if family_index % 2 == 0 { self.even } else { self.odd }
    }
}

/// Fixed family composition rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRule {
    pub slots: Vec<FamilySlot>,
}

impl FamilyRule {
    /// Members per family. Even and odd families must agree (checked in validation).
    pub fn family_size(&self) -> u32 {
        self.slots.iter().map(|s| s.even).sum()
    }
}

/// Work community bounds for one profession cohort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkBracketConfig {
    pub cohort: String,
    pub min_size: usize,
    pub max_size: usize,
}

impl WorkBracketConfig {
    pub fn new(cohort: impl Into<String>, min_size: usize, max_size: usize) -> Self {
        Self { cohort: cohort.into(), min_size, max_size }
    }
}

/// Fraction of a cohort that should end up in `target` friend groups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetShare {
    pub target: u32,
    pub fraction: f64,
}

/// Parameters of the friend-group synthesizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FriendGroupConfig {
    /// Probability of preferring a candidate with the seed's target count.
    pub pref_strength: f64,

    /// Size of the random candidate pool drawn for each new group.
    pub candidate_sample_size: usize,

    /// Upper bound on members per group (seed included).
    pub max_group_size: usize,

    /// Target-count distribution, applied in order to the shuffled cohort.
    pub distribution: Vec<TargetShare>,

    /// Target for people left over after integer rounding.
    pub default_target: u32,

    /// Which id pairs may not share a group.
    pub pairing: PairingRule,
}

impl Default for FriendGroupConfig {
    fn default() -> Self {
        Self {
            pref_strength: 0.7,
            candidate_sample_size: 100,
            max_group_size: 5,
            distribution: vec![
                TargetShare { target: 1, fraction: 0.10 },
                TargetShare { target: 2, fraction: 0.20 },
                TargetShare { target: 3, fraction: 0.40 },
                TargetShare { target: 4, fraction: 0.20 },
                TargetShare { target: 5, fraction: 0.10 },
            ],
            default_target: 3,
            pairing: PairingRule::Adjacent,
        }
    }
}

impl FriendGroupConfig {
    /// Largest target any person can be given.
    pub fn max_target(&self) -> u32 {
        self.distribution
            .iter()
            .map(|s| s.target)
            .chain(std::iter::once(self.default_target))
            .max()
            .unwrap_or(self.default_target)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pref_strength) {
            return Err(PopulationError::config(format!(
                "pref_strength {} must be within [0, 1]",
                self.pref_strength
            )));
        }
        if self.max_group_size == 0 {
            return Err(PopulationError::config("max_group_size must be at least 1"));
        }
        if self.default_target == 0 {
            return Err(PopulationError::config("default_target must be at least 1"));
        }
        let mut total = 0.0;
        for share in &self.distribution {
            if share.target == 0 {
                return Err(PopulationError::config("distribution targets must be at least 1"));
            }
            if !(0.0..=1.0).contains(&share.fraction) {
                return Err(PopulationError::config(format!(
                    "fraction {} for target {} must be within [0, 1]",
                    share.fraction, share.target
                )));
            }
            total += share.fraction;
        }
        if total > 1.0 + 1e-9 {
            return Err(PopulationError::config(format!(
                "distribution fractions sum to {:.3}, above 1",
                total
            )));
        }
        Ok(())
    }
}

/// Friend-group parameters for one age cohort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FriendGroupBracketConfig {
    pub cohort: String,
    #[serde(flatten)]
    pub params: FriendGroupConfig,
}

impl FriendGroupBracketConfig {
    pub fn new(cohort: impl Into<String>, params: FriendGroupConfig) -> Self {
        Self { cohort: cohort.into(), params }
    }
}

/// Full configuration of a population run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of nodes; ids are `0..population_size`.
    pub population_size: u32,

    /// Age cohorts. Must tile the whole population.
    pub age_cohorts: Vec<CohortRange>,

    /// Profession cohorts. Disjoint, may leave gaps.
    pub profession_cohorts: Vec<CohortRange>,

    /// Family composition rule over the age cohorts.
    pub family: FamilyRule,

    /// Work community bounds per profession cohort.
    pub work: Vec<WorkBracketConfig>,

    /// Friend-group parameters per age cohort.
    pub friend_groups: Vec<FriendGroupBracketConfig>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            population_size: 100_000,
            age_cohorts: vec![
                CohortRange::new("baby", 0, 9_999),
                CohortRange::new("kid", 10_000, 29_999),
                CohortRange::new("young_adult", 30_000, 49_999),
                CohortRange::new("adult", 50_000, 84_999),
                CohortRange::new("old", 85_000, 99_999),
            ],
            profession_cohorts: vec![
                CohortRange::new("A", 50_000, 59_711),
                CohortRange::new("B", 59_712, 72_836),
                CohortRange::new("C", 72_837, 84_999),
            ],
            family: FamilyRule {
                slots: vec![
                    FamilySlot::new("baby", 1, 1),
                    FamilySlot::new("kid", 2, 2),
                    FamilySlot::new("young_adult", 2, 2),
                    FamilySlot::new("adult", 4, 3),
                    FamilySlot::new("old", 1, 2),
                ],
            },
            work: vec![
                WorkBracketConfig::new("A", 15, 30),
                WorkBracketConfig::new("B", 10, 20),
            ],
            friend_groups: vec![
                FriendGroupBracketConfig::new("kid", FriendGroupConfig::default()),
                FriendGroupBracketConfig::new("young_adult", FriendGroupConfig::default()),
            ],
        }
    }
}

impl PopulationConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate everything that can be checked before generation starts
    /// and return the cohort index the generators will use.
    pub fn validate(&self) -> Result<CohortIndex> {
        let index = CohortIndex::new(
            self.population_size,
            self.age_cohorts.clone(),
            self.profession_cohorts.clone(),
        )?;

        super::families::FamilyPlan::new(&self.family, &index)?;

        let mut seen = HashSet::new();
        for bracket in &self.work {
            if index.range(Dimension::Profession, &bracket.cohort).is_none() {
                return Err(PopulationError::config(format!(
                    "work bracket refers to unknown profession cohort '{}'",
                    bracket.cohort
                )));
            }
            if !seen.insert(bracket.cohort.as_str()) {
                return Err(PopulationError::config(format!(
                    "profession cohort '{}' has more than one work bracket",
                    bracket.cohort
                )));
            }
            super::communities::validate_bounds(bracket.min_size, bracket.max_size)?;
        }

        let mut seen = HashSet::new();
        for bracket in &self.friend_groups {
            if index.range(Dimension::Age, &bracket.cohort).is_none() {
                return Err(PopulationError::config(format!(
                    "friend-group bracket refers to unknown age cohort '{}'",
                    bracket.cohort
                )));
            }
            if !seen.insert(bracket.cohort.as_str()) {
                return Err(PopulationError::config(format!(
                    "age cohort '{}' has more than one friend-group bracket",
                    bracket.cohort
                )));
            }
            bracket.params.validate()?;
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PopulationConfig::default();
        assert_eq!(config.population_size, 100_000);
        assert_eq!(config.family.family_size(), 10);
        assert_eq!(config.work.len(), 2);
        assert_eq!(config.friend_groups.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_target_includes_default() {
        let mut params = FriendGroupConfig::default();
        assert_eq!(params.max_target(), 5);
        params.default_target = 7;
        assert_eq!(params.max_target(), 7);
    }

    #[test]
    fn test_friend_params_rejected() {
        let mut params = FriendGroupConfig::default();
        params.pref_strength = 1.5;
        assert!(params.validate().is_err());

        let mut params = FriendGroupConfig::default();
        params.max_group_size = 0;
        assert!(params.validate().is_err());

        let mut params = FriendGroupConfig::default();
        params.distribution.push(TargetShare { target: 6, fraction: 0.2 });
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_work_bounds_rejected() {
        let mut config = PopulationConfig::default();
        config.work[0].min_size = 40;
        assert!(matches!(config.validate(), Err(PopulationError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unknown_cohort_rejected() {
        let mut config = PopulationConfig::default();
        config.work.push(WorkBracketConfig::new("Z", 5, 10));
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.friend_groups.push(FriendGroupBracketConfig::new("A", FriendGroupConfig::default()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_bracket_rejected() {
        let mut config = PopulationConfig::default();
        config.work.push(WorkBracketConfig::new("A", 5, 10));
        assert!(config.validate().is_err());

        let mut config = PopulationConfig::default();
        config.friend_groups.push(FriendGroupBracketConfig::new("kid", FriendGroupConfig::default()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PopulationConfig = serde_json::from_str(r#"{ "work": [] }"#).unwrap();
        assert_eq!(config.population_size, 100_000);
        assert!(config.work.is_empty());
        assert_eq!(config.friend_groups.len(), 2);
    }

    #[test]
    fn test_flattened_friend_params() {
        let json = r#"{ "cohort": "kid", "max_group_size": 3, "pairing": "EvenOddPair" }"#;
        let bracket: FriendGroupBracketConfig = serde_json::from_str(json).unwrap();
        assert_eq!(bracket.cohort, "kid");
        assert_eq!(bracket.params.max_group_size, 3);
        assert_eq!(bracket.params.pairing, PairingRule::EvenOddPair);
        assert_eq!(bracket.params.candidate_sample_size, 100);
    }
}
