//! Configuration JSON format.
//!
//! A file holds either a [`ConfigBundle`] (`{"active": ..., "snapshots": [...]}`)
//! or a bare [`ProcessConfig`], which is wrapped as a one-snapshot bundle.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::IoError;
use crate::models::{ConfigBundle, ProcessConfig};

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Bundle(ConfigBundle),
    Single(ProcessConfig),
}

/// Parses a configuration document.
pub fn parse_bundle(text: &str) -> Result<ConfigBundle, IoError> {
    let bundle = match serde_json::from_str::<ConfigFile>(text) {
        Ok(ConfigFile::Bundle(bundle)) => bundle,
        Ok(ConfigFile::Single(config)) => ConfigBundle::single(config),
        // Untagged errors say nothing useful; report the bundle parse error.
        Err(_) => serde_json::from_str::<ConfigBundle>(text)?,
    };
    debug!(snapshots = ?bundle.versions(), active = ?bundle.active, "parsed configuration");
    Ok(bundle)
}

/// Loads a configuration file.
pub fn load_bundle(path: &Path) -> Result<ConfigBundle, IoError> {
    let text = fs::read_to_string(path).map_err(|source| IoError::File {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bundle(&text)
}
