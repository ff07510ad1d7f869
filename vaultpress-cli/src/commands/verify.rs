//! Verify tagged documents without writing anything.

use crate::publish::Publisher;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use vaultpress_core::{Config, FsDocumentStore};
use vaultpress_types::{Diagnostic, DiagnosticSeverity};

#[derive(Serialize)]
struct VerificationSummary<'a> {
    items: usize,
    pending_writes: usize,
    errors: usize,
    warnings: usize,
    diagnostics: &'a [Diagnostic],
}

/// Extract and validate, then report diagnostics
///
/// Fails when any error-level diagnostic (e.g. a duplicate identifier) is found.
pub fn verify_site(config_path: &Path, json: bool) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let store = FsDocumentStore::new(config.vault_dir());
    let verified = Publisher::new(&config, &store)
        .verify()
        .context("Failed to read the vault")?;

    let count = |severity| {
        verified
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let summary = VerificationSummary {
        items: verified.items,
        pending_writes: verified.pending_writes,
        errors: count(DiagnosticSeverity::Error),
        warnings: count(DiagnosticSeverity::Warning),
        diagnostics: &verified.diagnostics,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Verification complete: {} posts, {} pending writes, {} errors, {} warnings",
            summary.items, summary.pending_writes, summary.errors, summary.warnings
        );
        for diag in summary.diagnostics {
            println!("- {}", diag);
        }
    }

    if summary.errors > 0 {
        anyhow::bail!("Verification found {} errors", summary.errors);
    }
    Ok(())
}
