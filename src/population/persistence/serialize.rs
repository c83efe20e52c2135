//! Population serialization and export.
//!
//! Provides save/load of a `Population` to JSON files with the seeds and
//! configuration that produced it, and `;`-delimited exports of person
//! records and contact edges.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PopulationError, Result};
use crate::population::config::PopulationConfig;
use crate::population::network::Population;
use crate::seeds::PopulationSeeds;

/// Metadata wrapper for the save file format.
#[derive(Serialize, Deserialize)]
struct PopulationSaveFile {
    /// Format version for forward compatibility
    version: u32,
    /// Seeds the population was generated from, overrides included
    seeds: PopulationSeeds,
    /// Configuration the population was generated with
    config: PopulationConfig,
    population: Population,
}

const SAVE_VERSION: u32 = 1;

/// Save a population to a JSON file.
pub fn save_population(population: &Population, config: &PopulationConfig, path: &Path) -> Result<()> {
    #[derive(Serialize)]
    struct SaveRef<'a> {
        version: u32,
        seeds: &'a PopulationSeeds,
        config: &'a PopulationConfig,
        population: &'a Population,
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(
        writer,
        &SaveRef { version: SAVE_VERSION, seeds: population.seeds(), config, population },
    )?;
    info!(path = %path.display(), "saved population");
    Ok(())
}

/// Result of loading a population file.
pub struct LoadedPopulation {
    pub population: Population,
    pub config: PopulationConfig,
    pub seeds: PopulationSeeds,
}

/// Load a population from a JSON file written by `save_population`.
pub fn load_population(path: &Path) -> Result<LoadedPopulation> {
    let reader = BufReader::new(File::open(path)?);
    let save: PopulationSaveFile = serde_json::from_reader(reader)?;

    if save.version > SAVE_VERSION {
        return Err(PopulationError::UnsupportedVersion {
            found: save.version,
            supported: SAVE_VERSION,
        });
    }

    Ok(LoadedPopulation {
        population: save.population,
        config: save.config,
        seeds: save.seeds,
    })
}

/// Export one row per node: `node;age;profession;family;friend_groups;community`.
///
/// Friend-group ids are `|`-separated; fields outside a generator's cohorts are empty.
pub fn export_records_csv(population: &Population, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "node;age;profession;family;friend_groups;community")?;

    for (node, person) in population.people() {
        let family = person.family_id.map(|id| id.0.to_string()).unwrap_or_default();
        let friends = person
            .friend_groups()
            .iter()
            .map(|id| id.0.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let community = person.community_id.map(|id| id.0.to_string()).unwrap_or_default();
        writeln!(
            out,
            "{};{};{};{};{};{}",
            node,
            population.age_cohort(node).unwrap_or_default(),
            population.profession_cohort(node).unwrap_or_default(),
            family,
            friends,
            community,
        )?;
    }

    out.flush()?;
    info!(path = %path.display(), rows = population.len(), "exported person records");
    Ok(())
}

/// Export unique undirected contact edges: `source;target;layer`.
pub fn export_edges_csv(population: &Population, path: &Path) -> Result<()> {
    let edges = population.edges();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "source;target;layer")?;
    for edge in &edges {
        writeln!(out, "{};{};{}", edge.source, edge.target, edge.layer)?;
    }
    out.flush()?;
    info!(path = %path.display(), edges = edges.len(), "exported contact edges");
    Ok(())
}

/// Write the effective configuration as pretty JSON.
pub fn save_config(config: &PopulationConfig, path: &Path) -> Result<()> {
    fs::write(path, config.to_json_pretty()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::assembler::{assemble_population, assemble_with_seed};
    use crate::population::cohorts::CohortRange;
    use crate::population::config::{FamilyRule, FamilySlot, FriendGroupBracketConfig, FriendGroupConfig, WorkBracketConfig};

    fn small_config() -> PopulationConfig {
        PopulationConfig {
            population_size: 60,
            age_cohorts: vec![CohortRange::new("kid", 0, 19), CohortRange::new("adult", 20, 59)],
            profession_cohorts: vec![CohortRange::new("A", 20, 49)],
            family: FamilyRule {
                slots: vec![FamilySlot::new("kid", 1, 1), FamilySlot::new("adult", 2, 2)],
            },
            work: vec![WorkBracketConfig::new("A", 4, 8)],
            friend_groups: vec![FriendGroupBracketConfig::new("kid", FriendGroupConfig::default())],
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.json");
        let config = small_config();
        let pop = assemble_with_seed(&config, 21).unwrap();

        save_population(&pop, &config, &path).unwrap();
        let loaded = load_population(&path).unwrap();

        assert_eq!(loaded.seeds, PopulationSeeds::from_master(21));
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.population.friend_groups(), pop.friend_groups());
        assert_eq!(loaded.population.person(5), pop.person(5));
        assert_eq!(loaded.population.age_cohort(30), Some("adult"));
    }

    #[test]
    fn test_overridden_seeds_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.json");
        let config = small_config();
        let seeds = PopulationSeeds::builder(8).friend_groups(12345).communities(777).build();
        let pop = assemble_population(&config, &seeds).unwrap();
        save_population(&pop, &config, &path).unwrap();

        let loaded = load_population(&path).unwrap();
        assert_eq!(loaded.seeds, seeds);

        let replay = assemble_population(&loaded.config, &loaded.seeds).unwrap();
        assert_eq!(replay.friend_groups(), pop.friend_groups());
        assert_eq!(replay.communities(), pop.communities());
        assert_eq!(
            serde_json::to_string(&replay).unwrap(),
            serde_json::to_string(&loaded.population).unwrap()
        );
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.json");
        let config = small_config();
        let pop = assemble_with_seed(&config, 1).unwrap();
        save_population(&pop, &config, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap().replacen("\"version\":1", "\"version\":99", 1);
        fs::write(&path, text).unwrap();

        assert!(matches!(
            load_population(&path),
            Err(PopulationError::UnsupportedVersion { found: 99, supported: 1 })
        ));
    }

    #[test]
    fn test_records_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let pop = assemble_with_seed(&small_config(), 2).unwrap();
        export_records_csv(&pop, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 61);
        assert_eq!(lines[0], "node;age;profession;family;friend_groups;community");
        // adult outside any profession: no friend groups, no community
        let last: Vec<&str> = lines[60].split(';').collect();
        assert_eq!(last[0], "59");
        assert_eq!(last[1], "adult");
        assert_eq!(last[2], "");
        assert!(!last[3].is_empty());
        assert_eq!(last[4], "");
        assert_eq!(last[5], "");
    }

    #[test]
    fn test_edges_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        let pop = assemble_with_seed(&small_config(), 2).unwrap();
        export_edges_csv(&pop, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), pop.edges().len() + 1);
        assert!(text.lines().all(|l| !l.trim().is_empty()));
        assert!(text.lines().skip(1).any(|l| l.ends_with(";family")));
    }
}
