//! Write side of the population table.
//!
//! Generators never touch `PersonRecord`s directly. The assembler routes
//! their output through these setters, each of which accepts a node at most
//! once per layer, and then freezes the builder into a `Population`.

use crate::error::{AssignmentWarning, PopulationError, Result};
use crate::seeds::PopulationSeeds;
use super::cohorts::CohortIndex;
use super::communities::WorkCommunity;
use super::families::Family;
use super::friend_groups::FriendGroup;
use super::network::{PersonRecord, Population};
use super::{CommunityId, FamilyId, FriendGroupId, Layer, NodeId};

#[derive(Debug)]
pub struct PopulationBuilder {
    cohorts: CohortIndex,
    people: Vec<PersonRecord>,
    families: Vec<Family>,
    friend_groups: Vec<FriendGroup>,
    communities: Vec<WorkCommunity>,
    warnings: Vec<AssignmentWarning>,
}

impl PopulationBuilder {
    pub fn new(cohorts: CohortIndex) -> Self {
        let size = cohorts.population_size() as usize;
        Self {
            cohorts,
            people: vec![PersonRecord::default(); size],
            families: Vec::new(),
            friend_groups: Vec::new(),
            communities: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn record(&mut self, node: NodeId) -> Result<&mut PersonRecord> {
        let population_size = self.cohorts.population_size();
        self.people
            .get_mut(node as usize)
            .ok_or(PopulationError::NodeOutOfRange { node, population_size })
    }

    pub fn set_family(&mut self, node: NodeId, id: FamilyId) -> Result<()> {
        let record = self.record(node)?;
        if record.family_id.is_some() {
            return Err(PopulationError::ConflictingAssignment { node, layer: Layer::Family });
        }
        record.family_id = Some(id);
        Ok(())
    }

    pub fn set_community(&mut self, node: NodeId, id: CommunityId) -> Result<()> {
        let record = self.record(node)?;
        if record.community_id.is_some() {
            return Err(PopulationError::ConflictingAssignment { node, layer: Layer::Work });
        }
        record.community_id = Some(id);
        Ok(())
    }

    pub fn set_friend_groups(
        &mut self,
        node: NodeId,
        ids: Vec<FriendGroupId>,
        target: u32,
    ) -> Result<()> {
        let record = self.record(node)?;
        if record.friend_group_ids.is_some() {
            return Err(PopulationError::ConflictingAssignment { node, layer: Layer::FriendGroup });
        }
        record.friend_group_ids = Some(ids);
        record.friend_group_target = Some(target);
        Ok(())
    }

    /// Number of friend groups added so far; the id offset for the next batch.
    pub fn friend_group_count(&self) -> usize {
        self.friend_groups.len()
    }

    /// Number of work communities added so far; the id offset for the next batch.
    pub fn community_count(&self) -> usize {
        self.communities.len()
    }

    pub fn add_families(&mut self, families: impl IntoIterator<Item = Family>) {
        self.families.extend(families);
    }

    pub fn add_friend_groups(&mut self, groups: impl IntoIterator<Item = FriendGroup>) {
        self.friend_groups.extend(groups);
    }

    pub fn add_communities(&mut self, communities: impl IntoIterator<Item = WorkCommunity>) {
        self.communities.extend(communities);
    }

    pub fn add_warning(&mut self, warning: AssignmentWarning) {
        self.warnings.push(warning);
    }

    pub fn freeze(self, seeds: PopulationSeeds) -> Population {
        Population::from_parts(
            seeds,
            self.cohorts,
            self.people,
            self.families,
            self.friend_groups,
            self.communities,
            self.warnings,
        )
    }
}
