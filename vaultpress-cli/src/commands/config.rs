//! Config inspection.

use anyhow::{Context, Result};
use std::path::Path;
use vaultpress_core::Config;

pub fn config_get(config_path: &Path, key: &str) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    match config.get(key) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => anyhow::bail!("Unknown or unset config key: {}", key),
    }
}
