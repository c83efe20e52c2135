//! Profiling tool for population generation at reference scale

use std::time::Instant;

use population_generator::population::cohorts::Dimension;
use population_generator::population::communities::generate_work_communities;
use population_generator::population::families::generate_families;
use population_generator::population::friend_groups::generate_friend_groups;
use population_generator::population::{Layer, PopulationConfig};
use population_generator::PopulationSeeds;

fn main() -> population_generator::Result<()> {
    let config = PopulationConfig::default();
    let seeds = PopulationSeeds::from_master(1337);
    let index = config.validate()?;

    println!("=== Performance Profiling ===");
    println!("Population: {}", config.population_size);
    println!();

    let start = Instant::now();
    let families = generate_families(&config.family, &index)?;
    let family_time = start.elapsed();
    println!("Families: {} in {:?}", families.families.len(), family_time);

    let mut friend_time = std::time::Duration::ZERO;
    for bracket in &config.friend_groups {
        let Some(range) = index.range(Dimension::Age, &bracket.cohort) else {
            continue;
        };

        // Candidate sampling trades group quality for speed
        for sample_size in [10, 50, bracket.params.candidate_sample_size, 500] {
            let mut params = bracket.params.clone();
            params.candidate_sample_size = sample_size;
            let mut rng = seeds.rng_for(Layer::FriendGroup, &bracket.cohort);

            let start = Instant::now();
            let outcome = generate_friend_groups(range, &params, &mut rng)?;
            let elapsed = start.elapsed();
            if sample_size == bracket.params.candidate_sample_size {
                friend_time += elapsed;
            }
            let mean = outcome.groups.iter().map(|g| g.len()).sum::<usize>() as f64
                / outcome.groups.len().max(1) as f64;
            println!(
                "Friend groups '{}' (sample {:>3}): {} groups, mean size {:.2}, {} iterations in {:?}",
                bracket.cohort,
                sample_size,
                outcome.groups.len(),
                mean,
                outcome.iterations,
                elapsed
            );
        }
    }

    let start = Instant::now();
    for bracket in &config.work {
        let Some(range) = index.range(Dimension::Profession, &bracket.cohort) else {
            continue;
        };
        let mut rng = seeds.rng_for(Layer::Work, &bracket.cohort);
        let partition = generate_work_communities(range, bracket.min_size, bracket.max_size, &mut rng)?;
        println!(
            "Work communities '{}': {} communities, {} unassigned",
            bracket.cohort,
            partition.communities.len(),
            partition.unassigned.len()
        );
    }
    let work_time = start.elapsed();

    let total = family_time + friend_time + work_time;
    println!("\n=== Summary ===");
    println!("Families:         {:>8.2}% ({:?})", 100.0 * family_time.as_secs_f64() / total.as_secs_f64(), family_time);
    println!("Friend groups:    {:>8.2}% ({:?})", 100.0 * friend_time.as_secs_f64() / total.as_secs_f64(), friend_time);
    println!("Work communities: {:>8.2}% ({:?})", 100.0 * work_time.as_secs_f64() / total.as_secs_f64(), work_time);
    println!("─────────────────────────────────");
    println!("Total:            {:?}", total);

    Ok(())
}
