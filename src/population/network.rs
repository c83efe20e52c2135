//! The assembled population.
//!
//! `Population` is the read-only substrate handed to the epidemic model:
//! one `PersonRecord` per node plus the three group collections, indexed
//! by their ids. It is produced once by the assembler and never mutated.

use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::error::AssignmentWarning;
use crate::seeds::PopulationSeeds;
use super::cohorts::CohortIndex;
use super::communities::WorkCommunity;
use super::families::Family;
use super::friend_groups::FriendGroup;
use super::{CommunityId, FamilyId, FriendGroupId, Layer, NodeId};

/// Memberships of one node. Unset fields mean the node lies outside the
/// cohorts that generator was run over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub family_id: Option<FamilyId>,
    pub friend_group_ids: Option<Vec<FriendGroupId>>,
    /// Number of friend groups this person was meant to join.
    pub friend_group_target: Option<u32>,
    pub community_id: Option<CommunityId>,
}

impl PersonRecord {
    pub fn friend_groups(&self) -> &[FriendGroupId] {
        self.friend_group_ids.as_deref().unwrap_or(&[])
    }
}

/// Another node sharing a group with the queried node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Contact {
    pub node: NodeId,
    pub layer: Layer,
}

/// Undirected contact edge, `source < target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub layer: Layer,
}

/// The complete population structure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Population {
    seeds: PopulationSeeds,
    cohorts: CohortIndex,
    people: Vec<PersonRecord>,
    families: Vec<Family>,
    friend_groups: Vec<FriendGroup>,
    communities: Vec<WorkCommunity>,
    warnings: Vec<AssignmentWarning>,
}

impl Population {
    /// Only the builder creates populations.
    pub(crate) fn from_parts(
        seeds: PopulationSeeds,
        cohorts: CohortIndex,
        people: Vec<PersonRecord>,
        families: Vec<Family>,
        friend_groups: Vec<FriendGroup>,
        communities: Vec<WorkCommunity>,
        warnings: Vec<AssignmentWarning>,
    ) -> Self {
        Self { seeds, cohorts, people, families, friend_groups, communities, warnings }
    }

    /// Master seed the population was generated from.
    pub fn seed(&self) -> u64 {
        self.seeds.master
    }

    /// Every seed the population was generated from, overrides included.
    pub fn seeds(&self) -> &PopulationSeeds {
        &self.seeds
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn person(&self, node: NodeId) -> Option<&PersonRecord> {
        self.people.get(node as usize)
    }

    pub fn people(&self) -> impl Iterator<Item = (NodeId, &PersonRecord)> {
        self.people.iter().enumerate().map(|(i, p)| (i as NodeId, p))
    }

    pub fn cohorts(&self) -> &CohortIndex {
        &self.cohorts
    }

    pub fn age_cohort(&self, node: NodeId) -> Option<&str> {
        self.cohorts.age_of(node)
    }

    pub fn profession_cohort(&self, node: NodeId) -> Option<&str> {
        self.cohorts.profession_of(node)
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(id.index())
    }

    pub fn friend_groups(&self) -> &[FriendGroup] {
        &self.friend_groups
    }

    pub fn friend_group(&self, id: FriendGroupId) -> Option<&FriendGroup> {
        self.friend_groups.get(id.index())
    }

    pub fn communities(&self) -> &[WorkCommunity] {
        &self.communities
    }

    pub fn community(&self, id: CommunityId) -> Option<&WorkCommunity> {
        self.communities.get(id.index())
    }

    /// Best-effort shortfalls reported during generation.
    pub fn warnings(&self) -> &[AssignmentWarning] {
        &self.warnings
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Everyone who shares a family, friend group or work community with
    /// `node`, one entry per (node, layer), sorted.
    pub fn contacts(&self, node: NodeId) -> Vec<Contact> {
        let Some(person) = self.person(node) else {
            return Vec::new();
        };

        let mut contacts = BTreeSet::new();
        let mut add = |members: &[NodeId], layer: Layer| {
            for &other in members {
                if other != node {
                    contacts.insert(Contact { node: other, layer });
                }
            }
        };

        if let Some(family) = person.family_id.and_then(|id| self.family(id)) {
            add(&family.members, Layer::Family);
        }
        for &id in person.friend_groups() {
            if let Some(group) = self.friend_group(id) {
                add(&group.members, Layer::FriendGroup);
            }
        }
        if let Some(community) = person.community_id.and_then(|id| self.community(id)) {
            add(&community.members, Layer::Work);
        }

        contacts.into_iter().collect()
    }

    /// All unique undirected contact edges, sorted by (source, target, layer).
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = BTreeSet::new();
        let groups = self
            .families
            .iter()
            .map(|f| (&f.members, Layer::Family))
            .chain(self.friend_groups.iter().map(|g| (&g.members, Layer::FriendGroup)))
            .chain(self.communities.iter().map(|c| (&c.members, Layer::Work)));

        for (members, layer) in groups {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    edges.insert(Edge { source: a.min(b), target: a.max(b), layer });
                }
            }
        }
        edges.into_iter().collect()
    }

    pub fn summary(&self) -> PopulationSummary {
        let mean = |total: usize, count: usize| {
            if count == 0 { 0.0 } else { total as f64 / count as f64 }
        };
        PopulationSummary {
            people: self.len(),
            families: self.families.len(),
            friend_groups: self.friend_groups.len(),
            communities: self.communities.len(),
            with_family: self.people.iter().filter(|p| p.family_id.is_some()).count(),
            with_friend_groups: self.people.iter().filter(|p| !p.friend_groups().is_empty()).count(),
            with_community: self.people.iter().filter(|p| p.community_id.is_some()).count(),
            mean_family_size: mean(self.families.iter().map(|f| f.len()).sum(), self.families.len()),
            mean_friend_group_size: mean(
                self.friend_groups.iter().map(|g| g.len()).sum(),
                self.friend_groups.len(),
            ),
            mean_community_size: mean(
                self.communities.iter().map(|c| c.len()).sum(),
                self.communities.len(),
            ),
            warnings: self.warnings.len(),
        }
    }
}

/// Summary statistics for display.
#[derive(Clone, Debug)]
pub struct PopulationSummary {
    pub people: usize,
    pub families: usize,
    pub friend_groups: usize,
    pub communities: usize,
    pub with_family: usize,
    pub with_friend_groups: usize,
    pub with_community: usize,
    pub mean_family_size: f64,
    pub mean_friend_group_size: f64,
    pub mean_community_size: f64,
    pub warnings: usize,
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Population: {} people ===", self.people)?;
        writeln!(
            f,
            "Families: {} (mean size {:.1}, {} people)",
            self.families, self.mean_family_size, self.with_family
        )?;
        writeln!(
            f,
            "Friend groups: {} (mean size {:.1}, {} people)",
            self.friend_groups, self.mean_friend_group_size, self.with_friend_groups
        )?;
        writeln!(
            f,
            "Work communities: {} (mean size {:.1}, {} people)",
            self.communities, self.mean_community_size, self.with_community
        )?;
        write!(f, "Warnings: {}", self.warnings)
    }
}
