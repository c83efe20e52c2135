//! Friend-group synthesizer.
//!
//! Greedy heuristic that places every person of a cohort into a target
//! number of small, overlapping friend groups:
//!
//! 1. Shuffle the cohort and hand out target counts following the
//!    configured distribution (rounding leftovers get `default_target`).
//! 2. While anyone is under target, pick a random under-target seed, draw
//!    a bounded random candidate pool from the other under-target people,
//!    and fill up to `max_group_size - 1` extra slots from it. Candidates
//!    paired with a current member are skipped; the rest are split into
//!    like-minded (same target as the seed) and other, and
//!    `pref_strength` decides which side is tried first.
//! 3. Every finished group bumps its members' counts.
//!
//! Each iteration adds a membership to an under-target seed, so the loop
//! ends within `cohort_size * max_target` iterations. That count is also
//! kept as a hard safety bound: exceeding it returns the groups formed so
//! far with an `AssignmentWarning`.

use std::collections::BTreeMap;
use rand::Rng;
use rand::seq::{index, SliceRandom};
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::error::{AssignmentWarning, Result};
use super::cohorts::CohortRange;
use super::config::FriendGroupConfig;
use super::{FriendGroupId, NodeId};

/// Which pairs of ids count as the same family and may not share a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairingRule {
    /// `x` and `y` differ by one and have opposite parity.
    #[default]
    Adjacent,
    /// Only `(2k, 2k + 1)` pairs.
    EvenOddPair,
}

impl PairingRule {
    pub fn are_paired(self, x: NodeId, y: NodeId) -> bool {
        match self {
            PairingRule::Adjacent => x.abs_diff(y) == 1 && x % 2 != y % 2,
            PairingRule::EvenOddPair => x ^ 1 == y,
        }
    }
}

/// A friend group. The seed is the first member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendGroup {
    pub id: FriendGroupId,
    pub cohort: String,
    pub members: Vec<NodeId>,
}

impl FriendGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Per-person progress while groups are being formed.
#[derive(Clone, Debug, Default)]
struct PersonState {
    target: u32,
    current: u32,
    groups: Vec<FriendGroupId>,
}

/// Output of the synthesizer for one cohort.
#[derive(Clone, Debug, Default)]
pub struct FriendGroupOutcome {
    pub groups: Vec<FriendGroup>,
    /// Group ids of every person in the cohort, possibly empty.
    pub memberships: BTreeMap<NodeId, Vec<FriendGroupId>>,
    /// Target group count handed to every person in the cohort.
    pub targets: BTreeMap<NodeId, u32>,
    pub iterations: usize,
    pub warning: Option<AssignmentWarning>,
}

impl FriendGroupOutcome {
    pub fn is_complete(&self) -> bool {
        self.warning.is_none()
    }
}

/// People still under target, with O(1) removal.
struct UnderTargetPool {
    members: Vec<usize>,
    position: Vec<Option<usize>>,
}

impl UnderTargetPool {
    fn new(len: usize) -> Self {
        Self {
            members: (0..len).collect(),
            position: (0..len).map(Some).collect(),
        }
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn remove(&mut self, person: usize) {
        if let Some(pos) = self.position[person].take() {
            self.members.swap_remove(pos);
            if let Some(&moved) = self.members.get(pos) {
                self.position[moved] = Some(pos);
            }
        }
    }
}

/// Form friend groups over `range`.
pub fn generate_friend_groups(
    range: &CohortRange,
    config: &FriendGroupConfig,
    rng: &mut impl Rng,
) -> Result<FriendGroupOutcome> {
    config.validate()?;

    let base = range.start;
    let node = |offset: usize| base + offset as NodeId;
    let mut people = assign_targets(range, config, rng);

    let max_iterations = people.len() * config.max_target() as usize;
    let mut pool = UnderTargetPool::new(people.len());
    let mut groups: Vec<FriendGroup> = Vec::new();
    let mut iterations = 0;
    let mut warning = None;

    while !pool.is_empty() {
        iterations += 1;
        if iterations > max_iterations {
            let incomplete = AssignmentWarning::FriendGroupsIncomplete {
                cohort: range.name.clone(),
                iterations: max_iterations,
                unmet: pool.len(),
            };
            warn!("{}", incomplete);
            warning = Some(incomplete);
            iterations = max_iterations;
            break;
        }

        let seed_pos = rng.gen_range(0..pool.len());
        let seed = pool.members[seed_pos];
        let seed_target = people[seed].target;
        let mut members = vec![seed];

        // Local candidate pool: a bounded sample of the other under-target people.
        let others = pool.len() - 1;
        let sample_size = others.min(config.candidate_sample_size);
        let mut candidates: Vec<usize> = if sample_size == 0 {
            Vec::new()
        } else {
            index::sample(rng, others, sample_size)
                .into_iter()
                .map(|i| pool.members[if i >= seed_pos { i + 1 } else { i }])
                .collect()
        };

        for _ in 1..config.max_group_size {
            let eligible: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|&(_, &c)| {
                    !members.contains(&c)
                        && !members.iter().any(|&m| {
                            config.pairing.are_paired(node(m), node(c))
                                || config.pairing.are_paired(node(c), node(m))
                        })
                })
                .map(|(pos, _)| pos)
                .collect();
            if eligible.is_empty() {
                break;
            }

            let (like_minded, other): (Vec<usize>, Vec<usize>) = eligible
                .into_iter()
                .partition(|&pos| people[candidates[pos]].target == seed_target);

            let (preferred, fallback) = if rng.gen::<f64>() < config.pref_strength {
                (&like_minded, &other)
            } else {
                (&other, &like_minded)
            };
            let chosen = match preferred.choose(rng).or_else(|| fallback.choose(rng)) {
                Some(&pos) => pos,
                None => break,
            };

            members.push(candidates.swap_remove(chosen));
        }

        let id = FriendGroupId(groups.len() as u32);
        for &person in &members {
            let state = &mut people[person];
            state.current += 1;
            state.groups.push(id);
            if state.current >= state.target {
                pool.remove(person);
            }
        }
        groups.push(FriendGroup {
            id,
            cohort: range.name.clone(),
            members: members.iter().map(|&m| node(m)).collect(),
        });
    }

    debug!(cohort = %range.name, iterations, max_iterations, "friend-group formation finished");
    info!(cohort = %range.name, groups = groups.len(), "generated friend groups");

    let mut memberships = BTreeMap::new();
    let mut targets = BTreeMap::new();
    for (offset, state) in people.into_iter().enumerate() {
        targets.insert(node(offset), state.target);
        memberships.insert(node(offset), state.groups);
    }

    Ok(FriendGroupOutcome { groups, memberships, targets, iterations, warning })
}

/// Shuffle the cohort and hand out target counts in distribution order.
fn assign_targets(
    range: &CohortRange,
    config: &FriendGroupConfig,
    rng: &mut impl Rng,
) -> Vec<PersonState> {
    let len = range.len();
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);

    let mut people = vec![PersonState::default(); len];
    let mut next = order.iter();
    for share in &config.distribution {
        let count = (len as f64 * share.fraction) as usize;
        for &person in next.by_ref().take(count) {
            people[person].target = share.target;
        }
    }
    for &person in next {
        people[person].target = config.default_target;
    }
    people
}
