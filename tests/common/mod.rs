//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;

use u_assign::cp::SolverConfig;
use u_assign::eligibility::ResolvedConfig;
use u_assign::io;
use u_assign::models::{ConfigBundle, Person, ProcessConfig};

/// Configuration bundle shipped in `config/process.json`.
pub fn shipped_bundle() -> ConfigBundle {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/process.json");
    io::load_bundle(&path).unwrap()
}

/// A snapshot of the shipped bundle (`None` = active "hierarchical").
pub fn snapshot(name: Option<&str>) -> ProcessConfig {
    shipped_bundle().select(name).unwrap().clone()
}

/// Hierarchical reference scenario with `n` instances.
pub fn reference(n: usize) -> ResolvedConfig {
    let mut config = snapshot(None);
    config.rules.instance_count = n;
    ResolvedConfig::resolve(&config).unwrap()
}

/// Reference scenario with a second maintenance manager, so that the
/// approval step (T1, two candidates) is the smallest pool.
pub fn reference_with_second_manager(n: usize) -> ResolvedConfig {
    let mut config = snapshot(None);
    config.rules.instance_count = n;
    config.persons.push(Person::new("AUX", "DM"));
    ResolvedConfig::resolve(&config).unwrap()
}

/// Seeded engine configuration.
pub fn seeded(seed: u64) -> SolverConfig {
    SolverConfig::default().with_seed(seed)
}
