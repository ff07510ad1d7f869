//! Init command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../../../vaultpress.yml.example");

/// Initialize a new vaultpress project
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root)?;
    scaffold_vault(root)?;

    println!("✓ vaultpress initialized in {:?}", root);
    println!("  - Edit vaultpress.yml to set the site title and remote repository");
    println!("  - Tag notes with `blog` to publish them");
    println!("  - Export VAULTPRESS_GITHUB_TOKEN before running `vaultpress publish`");
    Ok(())
}

fn write_config(root: &Path) -> Result<()> {
    let config_path = root.join("vaultpress.yml");
    if config_path.exists() {
        println!("vaultpress.yml already exists at {:?}", config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_vault(root: &Path) -> Result<()> {
    let vault_root = root.join("vault");
    fs::create_dir_all(&vault_root).with_context(|| format!("Failed to create {:?}", vault_root))?;

    let sample = vault_root.join("Hello vaultpress.md");
    if !sample.exists() {
        fs::write(&sample, sample_note()).with_context(|| format!("Failed to write {:?}", sample))?;
        println!("Created {:?}", sample);
    }
    Ok(())
}

fn sample_note() -> &'static str {
    r#"---
tags: [blog]
---

# Welcome

This note is tagged `blog`, so `vaultpress build` renders it into the staging
directory. On first publish its `slug` and `month` are written back here.

## Next steps

- Fill in `remote.owner` and `remote.repo` in `vaultpress.yml`
- Run `vaultpress publish --dry-run` to preview
"#
}
