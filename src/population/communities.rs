//! Work community partitioner.
//!
//! Randomly splits a profession cohort into disjoint communities whose
//! sizes lie in `[min_size, max_size]`. Coverage is best effort: a tail
//! shorter than `min_size` that cannot be folded into the last community
//! stays unassigned.

use std::collections::BTreeMap;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::error::{AssignmentWarning, PopulationError, Result};
use super::cohorts::CohortRange;
use super::{CommunityId, NodeId};

/// A work community, members sorted ascending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCommunity {
    pub id: CommunityId,
    pub cohort: String,
    pub members: Vec<NodeId>,
}

impl WorkCommunity {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Output of the work community partitioner for one cohort.
#[derive(Clone, Debug, Default)]
pub struct CommunityPartition {
    pub communities: Vec<WorkCommunity>,
    pub community_index: BTreeMap<NodeId, CommunityId>,
    /// Ids left over after the last community, sorted.
    pub unassigned: Vec<NodeId>,
    pub warning: Option<AssignmentWarning>,
}

/// Reject bounds the partitioner cannot honour.
pub fn validate_bounds(min_size: usize, max_size: usize) -> Result<()> {
    if min_size > max_size {
        return Err(PopulationError::config(format!(
            "min_size {} cannot be greater than max_size {}",
            min_size, max_size
        )));
    }
    if max_size == 0 {
        return Err(PopulationError::config("max_size must be at least 1"));
    }
    Ok(())
}

/// Partition `range` into work communities.
pub fn generate_work_communities(
    range: &CohortRange,
    min_size: usize,
    max_size: usize,
    rng: &mut impl Rng,
) -> Result<CommunityPartition> {
    validate_bounds(min_size, max_size)?;

    let mut ids: Vec<NodeId> = range.ids().collect();
    ids.shuffle(rng);

    let total = ids.len();
    let smallest_draw = min_size.max(1);
    let mut communities: Vec<WorkCommunity> = Vec::new();
    let mut community_index = BTreeMap::new();
    let mut pos = 0;

    while pos < total {
        let remaining = total - pos;
        if remaining < min_size {
            break;
        }

        let mut size = rng.gen_range(smallest_draw..=max_size.min(remaining));

        // Fold a too-small tail into this community when it still fits.
        let leftover = remaining - size;
        if leftover > 0 && leftover < min_size && size + leftover <= max_size {
            size += leftover;
        }

        let id = CommunityId(communities.len() as u32);
        let mut members = ids[pos..pos + size].to_vec();
        members.sort_unstable();
        for &node in &members {
            community_index.insert(node, id);
        }
        communities.push(WorkCommunity { id, cohort: range.name.clone(), members });
        pos += size;
    }

    let mut unassigned = ids[pos..].to_vec();
    unassigned.sort_unstable();

    let warning = if unassigned.is_empty() {
        None
    } else {
        let warning = AssignmentWarning::CommunityRemainder {
            cohort: range.name.clone(),
            unassigned: unassigned.len(),
        };
        warn!("{}", warning);
        Some(warning)
    };

    info!(
        cohort = %range.name,
        communities = communities.len(),
        assigned = community_index.len(),
        "generated work communities"
    );

    Ok(CommunityPartition { communities, community_index, unassigned, warning })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn check_partition(partition: &CommunityPartition, range: &CohortRange, min: usize, max: usize) {
        let mut seen = std::collections::HashSet::new();
        for community in &partition.communities {
            assert!(community.len() >= min && community.len() <= max, "size {}", community.len());
            assert!(community.members.windows(2).all(|w| w[0] < w[1]));
            for &node in &community.members {
                assert!(range.contains(node));
                assert!(seen.insert(node), "node {} in two communities", node);
            }
        }
        assert_eq!(seen.len() + partition.unassigned.len(), range.len());
        assert!(partition.unassigned.len() < min.max(1));
    }

    #[test]
    fn test_small_range_bounds() {
        let range = CohortRange::new("A", 0, 8);
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let partition = generate_work_communities(&range, 3, 5, &mut rng).unwrap();
            check_partition(&partition, &range, 3, 5);
            assert!(partition.community_index.len() >= 6);
            assert!(!partition.communities.is_empty());
        }
    }

    #[test]
    fn test_large_range_bounds() {
        let range = CohortRange::new("A", 50_000, 59_711);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let partition = generate_work_communities(&range, 15, 30, &mut rng).unwrap();
        check_partition(&partition, &range, 15, 30);
    }

    #[test]
    fn test_remainder_reported() {
        // 4 ids with min 3, max 3: one community of 3, one id stranded
        let range = CohortRange::new("B", 10, 13);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let partition = generate_work_communities(&range, 3, 3, &mut rng).unwrap();
        assert_eq!(partition.communities.len(), 1);
        assert_eq!(partition.unassigned.len(), 1);
        assert_eq!(
            partition.warning,
            Some(AssignmentWarning::CommunityRemainder { cohort: "B".to_string(), unassigned: 1 })
        );
    }

    #[test]
    fn test_remainder_folded() {
        // 7 ids, min 3, max 7: any first draw leaving 1 or 2 is folded in
        let range = CohortRange::new("C", 0, 6);
        for seed in 0..30 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let partition = generate_work_communities(&range, 3, 7, &mut rng).unwrap();
            assert!(partition.unassigned.is_empty());
            assert!(partition.warning.is_none());
        }
    }

    #[test]
    fn test_range_smaller_than_min() {
        let range = CohortRange::new("D", 0, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let partition = generate_work_communities(&range, 3, 5, &mut rng).unwrap();
        assert!(partition.communities.is_empty());
        assert_eq!(partition.unassigned, vec![0, 1]);
    }

    #[test]
    fn test_zero_min_size_terminates() {
        let range = CohortRange::new("E", 0, 19);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let partition = generate_work_communities(&range, 0, 4, &mut rng).unwrap();
        assert_eq!(partition.community_index.len(), 20);
        assert!(partition.communities.iter().all(|c| !c.is_empty() && c.len() <= 4));
    }

    #[test]
    fn test_invalid_bounds() {
        let range = CohortRange::new("A", 0, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = generate_work_communities(&range, 5, 3, &mut rng).unwrap_err();
        assert!(matches!(err, PopulationError::InvalidConfiguration(_)));
        assert!(generate_work_communities(&range, 0, 0, &mut rng).is_err());
    }

    #[test]
    fn test_deterministic() {
        let range = CohortRange::new("A", 100, 399);
        let a = generate_work_communities(&range, 10, 20, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        let b = generate_work_communities(&range, 10, 20, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        assert_eq!(a.communities, b.communities);
    }
}
