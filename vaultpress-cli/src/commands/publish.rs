//! Publish command implementation.

use crate::publish::{PublishError, PublishMode, PublishReport, Publisher};
use anyhow::{Context, Result};
use std::path::Path;
use vaultpress_core::{Config, FsDocumentStore};
use vaultpress_sync::{CancelFlag, SyncEngine, SyncOptions};
use vaultpress_types::DiagnosticSeverity;

#[derive(Debug, Default)]
pub struct PublishOptions {
    pub dry_run: bool,
    pub json: bool,
    /// Overrides `remote.token`
    pub token: Option<String>,
}

/// Render, stage and push the blog
pub async fn publish_site(config_path: &Path, opts: PublishOptions) -> Result<()> {
    let mut config = Config::from_file(config_path).context("Failed to load configuration")?;
    if let Some(token) = opts.token.as_deref().filter(|t| !t.trim().is_empty()) {
        config.remote.token = Some(token.to_string());
    }

    let push = config.publish.sync && !opts.dry_run;
    if !push {
        tracing::info!("Remote sync disabled; staging only");
    }

    let engine = if push {
        match SyncEngine::github(&config.remote, SyncOptions::from_config(&config)) {
            Ok(engine) => Some(engine.with_cancel(cancel_on_ctrl_c())),
            Err(err) => {
                let report = PublishReport::aborted(&PublishError::from(err));
                print_report(&report, &opts)?;
                anyhow::bail!("Publish aborted");
            }
        }
    } else {
        None
    };

    let store = FsDocumentStore::new(config.vault_dir());
    let mut publisher = Publisher::new(&config, &store);
    let mode = match engine {
        Some(engine) => {
            publisher = publisher.with_engine(engine);
            PublishMode::Sync
        }
        None => PublishMode::StageOnly,
    };

    let report = publisher.publish(mode).await;
    print_report(&report, &opts)?;
    if !report.success {
        anyhow::bail!("Publish failed");
    }
    Ok(())
}

/// Flag that trips on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancelFlag {
    let flag = CancelFlag::new();
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping before the remote branch is updated");
            handle.cancel();
        }
    });
    flag
}

pub(crate) fn print_report(report: &PublishReport, opts: &PublishOptions) -> Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for diag in &report.diagnostics {
        println!("- {}", diag);
    }
    if let Some(sync) = &report.sync {
        for failed in sync.failed() {
            println!("- failed {}", failed.path);
        }
    }
    println!("{}", report.summary());

    let errors = report.count(DiagnosticSeverity::Error);
    let warnings = report.count(DiagnosticSeverity::Warning);
    if errors + warnings > 0 {
        println!("{} errors, {} warnings", errors, warnings);
    }
    Ok(())
}
