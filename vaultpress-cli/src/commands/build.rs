//! Build command implementation.

use super::publish::{print_report, PublishOptions};
use crate::publish::{PublishMode, Publisher};
use anyhow::{Context, Result};
use std::path::Path;
use vaultpress_core::{Config, FsDocumentStore};

/// Render the blog into the staging directory
pub async fn build_site(config_path: &Path) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    tracing::info!("Building site: {}", config.site.title);
    let store = FsDocumentStore::new(config.vault_dir());
    let report = Publisher::new(&config, &store)
        .publish(PublishMode::StageOnly)
        .await;

    print_report(&report, &PublishOptions::default())?;
    if !report.success {
        anyhow::bail!("Build failed");
    }
    println!("✓ Site staged in {:?}", config.output_dir());
    Ok(())
}
