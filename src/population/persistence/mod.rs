//! Population persistence - save/load and export.
//!
//! Saves and loads a `Population` to/from JSON files, and exports person
//! records and contact edges as delimited text for downstream tooling.

pub mod serialize;

pub use serialize::{
    export_edges_csv, export_records_csv, load_population, save_config, save_population,
    LoadedPopulation,
};
