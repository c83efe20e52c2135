//! Population assembly.
//!
//! Runs the three generators over their configured cohorts and merges the
//! results: families across all family cohorts, friend groups once per
//! configured age cohort, work communities once per profession cohort.
//! Friend-group and community ids from each run are shifted by the number
//! of groups produced by earlier runs so the merged collections can be
//! indexed directly by id.

use tracing::info;

use crate::error::{PopulationError, Result};
use crate::seeds::PopulationSeeds;
use super::builder::PopulationBuilder;
use super::cohorts::{CohortIndex, CohortRange, Dimension};
use super::communities::{generate_work_communities, WorkCommunity};
use super::config::PopulationConfig;
use super::families::generate_families;
use super::friend_groups::{generate_friend_groups, FriendGroup};
use super::network::Population;
use super::{Layer, NodeId};

/// Build a population from `config`, drawing randomness from `seeds`.
///
/// Configuration errors abort before any generator runs. Shortfalls in a
/// single generator are recorded as warnings on the result.
pub fn assemble_population(config: &PopulationConfig, seeds: &PopulationSeeds) -> Result<Population> {
    let index = config.validate()?;
    info!(population = config.population_size, seed = seeds.master, "assembling population");

    let mut builder = PopulationBuilder::new(index.clone());

    let families = generate_families(&config.family, &index)?;
    for (&node, &id) in &families.family_index {
        builder.set_family(node, id)?;
    }
    builder.add_families(families.families);

    for bracket in &config.friend_groups {
        let range = cohort_range(&index, Dimension::Age, &bracket.cohort)?;
        let mut rng = seeds.rng_for(Layer::FriendGroup, &bracket.cohort);
        let outcome = generate_friend_groups(range, &bracket.params, &mut rng)?;

        let offset = builder.friend_group_count();
        for (node, groups) in outcome.memberships {
            let target = outcome.targets.get(&node).copied().unwrap_or(0);
            let ids = groups.into_iter().map(|id| id.offset(offset)).collect();
            builder.set_friend_groups(node, ids, target)?;
        }
        builder.add_friend_groups(outcome.groups.into_iter().map(|group| FriendGroup {
            id: group.id.offset(offset),
            ..group
        }));
        if let Some(warning) = outcome.warning {
            builder.add_warning(warning);
        }
    }

    for bracket in &config.work {
        let range = cohort_range(&index, Dimension::Profession, &bracket.cohort)?;
        let mut rng = seeds.rng_for(Layer::Work, &bracket.cohort);
        let partition =
            generate_work_communities(range, bracket.min_size, bracket.max_size, &mut rng)?;

        let offset = builder.community_count();
        for (&node, &id) in &partition.community_index {
            builder.set_community(node, id.offset(offset))?;
        }
        builder.add_communities(partition.communities.into_iter().map(|community| WorkCommunity {
            id: community.id.offset(offset),
            ..community
        }));
        if let Some(warning) = partition.warning {
            builder.add_warning(warning);
        }
    }

    let population = builder.freeze(seeds.clone());
    info!(
        families = population.families().len(),
        friend_groups = population.friend_groups().len(),
        communities = population.communities().len(),
        warnings = population.warnings().len(),
        "population assembled"
    );
    Ok(population)
}

/// Convenience wrapper: assemble with seeds derived from one master seed.
pub fn assemble_with_seed(config: &PopulationConfig, seed: u64) -> Result<Population> {
    assemble_population(config, &PopulationSeeds::from_master(seed))
}

fn cohort_range<'a>(index: &'a CohortIndex, dimension: Dimension, name: &str) -> Result<&'a CohortRange> {
    index.range(dimension, name).ok_or_else(|| {
        PopulationError::config(format!("unknown {} cohort '{}'", dimension, name))
    })
}

/// Node ids inside the cohorts a layer's generator is configured to run over, sorted.
pub fn bracket_coverage(config: &PopulationConfig, index: &CohortIndex, layer: Layer) -> Vec<NodeId> {
    let ranges: Vec<&CohortRange> = match layer {
        Layer::Family => config
            .family
            .slots
            .iter()
            .filter_map(|s| index.range(Dimension::Age, &s.cohort))
            .collect(),
        Layer::FriendGroup => config
            .friend_groups
            .iter()
            .filter_map(|b| index.range(Dimension::Age, &b.cohort))
            .collect(),
        Layer::Work => config
            .work
            .iter()
            .filter_map(|b| index.range(Dimension::Profession, &b.cohort))
            .collect(),
    };
    let mut nodes: Vec<NodeId> = ranges.into_iter().flat_map(|r| r.ids()).collect();
    nodes.sort_unstable();
    nodes
}
