//! Family partitioner.
//!
//! Deterministically carves the age cohorts into fixed-size families. Each
//! cohort has a read cursor; family `i` takes the next `even` or `odd`
//! members from every cohort depending on the parity of `i`.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::error::{PopulationError, Result};
use super::cohorts::{CohortIndex, CohortRange, Dimension};
use super::config::{FamilyRule, FamilySlot};
use super::{FamilyId, NodeId};

/// A family and its members, in cohort order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub members: Vec<NodeId>,
}

impl Family {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Output of the family partitioner.
#[derive(Clone, Debug, Default)]
pub struct FamilyPartition {
    pub families: Vec<Family>,
    pub family_index: BTreeMap<NodeId, FamilyId>,
}

/// A family rule checked against concrete cohort ranges.
#[derive(Clone, Debug)]
pub struct FamilyPlan {
    pub family_count: usize,
    pub family_size: usize,
    slots: Vec<(FamilySlot, CohortRange)>,
}

impl FamilyPlan {
    /// Resolve the rule's cohorts and check that the families consume every
    /// id of every cohort they draw from, no more and no less.
    pub fn new(rule: &FamilyRule, index: &CohortIndex) -> Result<Self> {
        if rule.slots.is_empty() {
            return Err(PopulationError::config("family rule has no slots"));
        }

        let mut slots: Vec<(FamilySlot, CohortRange)> = Vec::with_capacity(rule.slots.len());
        for slot in &rule.slots {
            let range = index.range(Dimension::Age, &slot.cohort).ok_or_else(|| {
                PopulationError::config(format!(
                    "family rule refers to unknown age cohort '{}'",
                    slot.cohort
                ))
            })?;
            if slots.iter().any(|(s, _)| s.cohort == slot.cohort) {
                return Err(PopulationError::config(format!(
                    "family rule lists cohort '{}' twice",
                    slot.cohort
                )));
            }
            slots.push((slot.clone(), range.clone()));
        }

        let even_size: u32 = rule.slots.iter().map(|s| s.even).sum();
        let odd_size: u32 = rule.slots.iter().map(|s| s.odd).sum();
        if even_size != odd_size {
            return Err(PopulationError::config(format!(
                "even families have {} members but odd families have {}",
                even_size, odd_size
            )));
        }
        if even_size == 0 {
            return Err(PopulationError::config("family size must be positive"));
        }

        let family_size = even_size as usize;
        let covered: usize = slots.iter().map(|(_, r)| r.len()).sum();
        if covered % family_size != 0 {
            return Err(PopulationError::config(format!(
                "{} family-covered ids do not divide into families of {}",
                covered, family_size
            )));
        }
        let family_count = covered / family_size;

        let even_families = (family_count + 1) / 2;
        let odd_families = family_count / 2;
        for (slot, range) in &slots {
            let demand = even_families * slot.even as usize + odd_families * slot.odd as usize;
            if demand > range.len() {
                return Err(PopulationError::config(format!(
                    "families need {} '{}' members but the cohort holds {}",
                    demand,
                    slot.cohort,
                    range.len()
                )));
            }
            if demand < range.len() {
                return Err(PopulationError::config(format!(
                    "families use {} of {} '{}' members, stranding the rest",
                    demand,
                    range.len(),
                    slot.cohort
                )));
            }
        }

        Ok(Self { family_count, family_size, slots })
    }
}

/// Partition the family-covered age cohorts into families.
pub fn generate_families(rule: &FamilyRule, index: &CohortIndex) -> Result<FamilyPartition> {
    let plan = FamilyPlan::new(rule, index)?;

    let mut cursors = vec![0u32; plan.slots.len()];
    let mut families = Vec::with_capacity(plan.family_count);
    let mut family_index = BTreeMap::new();

    for i in 0..plan.family_count {
        let id = FamilyId(i as u32);
        let mut members = Vec::with_capacity(plan.family_size);

        for ((slot, range), cursor) in plan.slots.iter().zip(cursors.iter_mut()) {
            for _ in 0..slot.count_for(i) {
                let node = range.start + *cursor;
                *cursor += 1;
                members.push(node);
                family_index.insert(node, id);
            }
        }

        families.push(Family { id, members });
    }

    info!(
        families = families.len(),
        family_size = plan.family_size,
        "generated families"
    );

    Ok(FamilyPartition { families, family_index })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index() -> CohortIndex {
        CohortIndex::new(
            40,
            vec![
                CohortRange::new("child", 0, 9),
                CohortRange::new("adult", 10, 24),
                CohortRange::new("old", 25, 39),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    fn small_rule() -> FamilyRule {
        // uniform families of 5
        FamilyRule {
            slots: vec![
                FamilySlot::new("child", 1, 1),
                FamilySlot::new("adult", 2, 2),
                FamilySlot::new("old", 2, 2),
            ],
        }
    }

    #[test]
    fn test_families_are_total() {
        let index = small_index();
        // child 10, adult 15, old 15 -> 40 ids, but uniform rule needs 8/16/16
        assert!(generate_families(&small_rule(), &index).is_err());

        let rule = FamilyRule {
            slots: vec![
                FamilySlot::new("child", 1, 1),
                FamilySlot::new("adult", 2, 2),
                FamilySlot::new("old", 1, 1),
            ],
        };
        // 10 families of 4 need 10 / 20 / 10
        assert!(generate_families(&rule, &index).is_err());

        let rule = FamilyRule {
            slots: vec![
                FamilySlot::new("child", 1, 1),
                FamilySlot::new("adult", 2, 1),
                FamilySlot::new("old", 1, 2),
            ],
        };
        // 10 families of 4: adults 5*2 + 5*1 = 15, olds 5*1 + 5*2 = 15
        let partition = generate_families(&rule, &index).unwrap();
        assert_eq!(partition.families.len(), 10);
        assert_eq!(partition.family_index.len(), 40);
        assert!(partition.families.iter().all(|f| f.len() == 4));
        for node in 0..40 {
            assert!(partition.family_index.contains_key(&node));
        }
    }

    #[test]
    fn test_parity_composition() {
        let index = small_index();
        let rule = FamilyRule {
            slots: vec![
                FamilySlot::new("child", 1, 1),
                FamilySlot::new("adult", 2, 1),
                FamilySlot::new("old", 1, 2),
            ],
        };
        let partition = generate_families(&rule, &index).unwrap();

        let first = &partition.families[0];
        assert_eq!(first.members, vec![0, 10, 11, 25]);
        let second = &partition.families[1];
        assert_eq!(second.members, vec![1, 12, 26, 27]);

        for family in &partition.families {
            let adults = family.members.iter().filter(|&&n| (10..=24).contains(&n)).count();
            let expected = if family.id.index() % 2 == 0 { 2 } else { 1 };
            assert_eq!(adults, expected);
        }
    }

    #[test]
    fn test_reference_rule() {
        let config = crate::population::PopulationConfig::default();
        let index = config.validate().unwrap();
        let partition = generate_families(&config.family, &index).unwrap();
        assert_eq!(partition.families.len(), 10_000);
        assert_eq!(partition.family_index.len(), 100_000);
        assert_eq!(partition.family_index[&99_999], FamilyId(9_999));
    }

    #[test]
    fn test_unbalanced_parity_rejected() {
        let rule = FamilyRule {
            slots: vec![FamilySlot::new("child", 1, 2)],
        };
        let err = generate_families(&rule, &small_index()).unwrap_err();
        assert!(err.to_string().contains("even families"));
    }

    #[test]
    fn test_unknown_cohort_rejected() {
        let rule = FamilyRule {
            slots: vec![FamilySlot::new("teen", 1, 1)],
        };
        assert!(generate_families(&rule, &small_index()).is_err());
    }
}
