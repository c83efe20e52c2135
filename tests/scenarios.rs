//! End-to-end checks of the documented generator scenarios.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use population_generator::population::cohorts::{CohortIndex, CohortRange};
use population_generator::population::communities::generate_work_communities;
use population_generator::population::config::{FamilyRule, FamilySlot, FriendGroupConfig, TargetShare};
use population_generator::population::families::generate_families;
use population_generator::population::friend_groups::generate_friend_groups;

#[test]
fn test_scenario_a_small_profession_range() {
    let range = CohortRange::new("A", 0, 8);
    for seed in 0..100 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let partition = generate_work_communities(&range, 3, 5, &mut rng).unwrap();

        assert!(!partition.communities.is_empty());
        let covered: usize = partition.communities.iter().map(|c| c.len()).sum();
        assert!(covered >= 6, "seed {} covered only {}", seed, covered);
        assert!(9 - covered < 3);
        for community in &partition.communities {
            assert!((3..=5).contains(&community.len()));
        }
    }
}

#[test]
fn test_scenario_b_friend_groups_exclude_adjacent_ids() {
    let range = CohortRange::new("kid", 0, 19);
    let config = FriendGroupConfig {
        pref_strength: 1.0,
        max_group_size: 5,
        distribution: vec![
            TargetShare { target: 1, fraction: 0.1 },
            TargetShare { target: 2, fraction: 0.2 },
            TargetShare { target: 3, fraction: 0.4 },
            TargetShare { target: 4, fraction: 0.2 },
            TargetShare { target: 5, fraction: 0.1 },
        ],
        ..FriendGroupConfig::default()
    };

    for seed in 0..50 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let outcome = generate_friend_groups(&range, &config, &mut rng).unwrap();

        assert!(outcome.iterations <= 20 * 5);
        assert!(outcome.warning.is_none());
        for group in &outcome.groups {
            assert!((1..=5).contains(&group.len()));
            for &x in &group.members {
                let opposite_parity_neighbour = group
                    .members
                    .iter()
                    .any(|&y| x.abs_diff(y) == 1 && x % 2 != y % 2);
                assert!(!opposite_parity_neighbour, "group {:?}", group.members);
            }
        }
    }
}

#[test]
fn test_scenario_c_hundred_id_families() {
    let index = CohortIndex::new(
        100,
        vec![
            CohortRange::new("baby", 0, 9),
            CohortRange::new("kid", 10, 29),
            CohortRange::new("young_adult", 30, 49),
            CohortRange::new("adult", 50, 84),
            CohortRange::new("old", 85, 99),
        ],
        Vec::new(),
    )
    .unwrap();
    let rule = FamilyRule {
        slots: vec![
            FamilySlot::new("baby", 1, 1),
            FamilySlot::new("kid", 2, 2),
            FamilySlot::new("young_adult", 2, 2),
            FamilySlot::new("adult", 4, 3),
            FamilySlot::new("old", 1, 2),
        ],
    };

    let partition = generate_families(&rule, &index).unwrap();
    assert_eq!(partition.families.len(), 10);
    assert!(partition.families.iter().all(|f| f.len() == 10));
    assert_eq!(partition.family_index.len(), 100);
    for node in 0..100 {
        let id = partition.family_index[&node];
        assert!(partition.families[id.index()].members.contains(&node));
    }

    for family in &partition.families {
        let olds = family.members.iter().filter(|&&n| n >= 85).count();
        let adults = family.members.iter().filter(|&&n| (50..85).contains(&n)).count();
        if family.id.index() % 2 == 0 {
            assert_eq!((adults, olds), (4, 1));
        } else {
            assert_eq!((adults, olds), (3, 2));
        }
    }
}
