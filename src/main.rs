use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use population_generator::population::persistence::{
    export_edges_csv, export_records_csv, save_config, save_population,
};
use population_generator::population::validation::validate_population;
use population_generator::{assemble_population, PopulationConfig, PopulationSeeds};

#[derive(Parser, Debug)]
#[command(name = "population_generator")]
#[command(about = "Generate family, work and friend-group structure for a synthetic population")]
struct Args {
    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON configuration file (reference 100k population if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the friend-group seed
    #[arg(long)]
    friend_seed: Option<u64>,

    /// Override the work community seed
    #[arg(long)]
    work_seed: Option<u64>,

    /// Save the population as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export per-node records (`;`-delimited)
    #[arg(long)]
    export_records: Option<PathBuf>,

    /// Export contact edges (`;`-delimited)
    #[arg(long)]
    export_edges: Option<PathBuf>,

    /// Write the effective configuration as JSON and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Check every structural invariant after generation
    #[arg(long)]
    verify: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when verification was requested and failed.
fn run(args: &Args) -> population_generator::Result<bool> {
    let config = match &args.config {
        Some(path) => PopulationConfig::from_json_file(path)?,
        None => PopulationConfig::default(),
    };

    if let Some(path) = &args.write_config {
        save_config(&config, path)?;
        println!("Configuration written to {}", path.display());
        return Ok(true);
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut builder = PopulationSeeds::builder(seed);
    if let Some(s) = args.friend_seed {
        builder = builder.friend_groups(s);
    }
    if let Some(s) = args.work_seed {
        builder = builder.communities(s);
    }
    let seeds = builder.build();

    println!("Generating population with seed: {}", seed);
    println!("{}", seeds);

    let population = assemble_population(&config, &seeds)?;
    println!("{}", population.summary());
    for warning in population.warnings() {
        println!("  warning: {}", warning);
    }

    if let Some(path) = &args.output {
        save_population(&population, &config, path)?;
        println!("Population saved to {}", path.display());
    }
    if let Some(path) = &args.export_records {
        export_records_csv(&population, path)?;
        println!("Records exported to {}", path.display());
    }
    if let Some(path) = &args.export_edges {
        export_edges_csv(&population, path)?;
        println!("Edges exported to {}", path.display());
    }

    if args.verify {
        let report = validate_population(&population, &config);
        println!("{}", report.format());
        return Ok(report.is_valid());
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_config_flag() {
        let args = Args::try_parse_from(["population_generator", "--write-config", "cfg.json"]).unwrap();
        assert_eq!(args.write_config, Some(PathBuf::from("cfg.json")));
        assert!(args.seed.is_none());

        assert!(Args::try_parse_from(["population_generator", "--print-config", "cfg.json"]).is_err());
    }

    #[test]
    fn test_seed_overrides_parse() {
        let args = Args::try_parse_from([
            "population_generator",
            "--seed",
            "8",
            "--friend-seed",
            "12345",
            "--verify",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(8));
        assert_eq!(args.friend_seed, Some(12345));
        assert!(args.work_seed.is_none());
        assert!(args.verify);
    }
}
