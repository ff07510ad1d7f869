//! The publish orchestrator: extract, persist, validate, render, stage, sync.

use crate::staging::stage_outputs;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vaultpress_core::extract::{ExtractOptions, ItemExtractor, PendingWrite};
use vaultpress_core::frontmatter::merge_frontmatter;
use vaultpress_core::store::{DocumentStore, StoreError};
use vaultpress_core::validate::{validate, ValidationReport};
use vaultpress_core::Config;
use vaultpress_render::{RenderError, RenderPipeline, SiteOptions};
use vaultpress_sync::{SyncEngine, SyncError};
use vaultpress_types::{Diagnostic, DiagnosticSeverity, FileOutcome, OutputFile, SyncResult};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(ValidationReport),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("{0}")]
    RemoteConflict(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Publish cancelled before the remote branch was updated")]
    Cancelled,

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<SyncError> for PublishError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Configuration(e) => PublishError::Configuration(e.to_string()),
            conflict @ SyncError::Conflict { .. } => PublishError::RemoteConflict(conflict.to_string()),
            SyncError::Remote(e) => PublishError::Remote(e.to_string()),
            SyncError::Cancelled => PublishError::Cancelled,
        }
    }
}

/// Whether a run pushes to the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Render into the staging directory only
    StageOnly,
    /// Stage, then synchronize the remote branch
    Sync,
}

/// Everything a run produced, for display or `--json`
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub success: bool,
    /// Number of items that passed extraction
    pub items: usize,
    /// Staged paths, relative to the staging directory
    pub staged: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncResult>,
    /// Reason the run stopped, when it was aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PublishReport {
    /// A run that stopped before doing anything
    pub fn aborted(err: &PublishError) -> Self {
        Self {
            failure: Some(err.to_string()),
            ..Self::default()
        }
    }

    /// One line for the user: full success, partial success or abort reason
    pub fn summary(&self) -> String {
        if let Some(reason) = &self.failure {
            return format!("Publish aborted: {}", reason);
        }
        match &self.sync {
            Some(sync) if !sync.success() => {
                let failed: Vec<&str> = sync.failed().map(|f| f.path.as_str()).collect();
                format!(
                    "Published with failures: {} of {} files failed ({})",
                    failed.len(),
                    sync.files().len(),
                    failed.join(", ")
                )
            }
            Some(sync) => format!(
                "Published {} posts: {} files written, {} unchanged",
                self.items,
                sync.count(|o| matches!(o, FileOutcome::Written)),
                sync.count(|o| matches!(o, FileOutcome::SkippedUnchanged)),
            ),
            None => format!("Staged {} posts ({} files)", self.items, self.staged.len()),
        }
    }

    pub fn count(&self, severity: DiagnosticSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Result of extraction plus validation, without side effects
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub items: usize,
    pub pending_writes: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Sequences one publish run over a document store
pub struct Publisher<'a> {
    config: &'a Config,
    store: &'a dyn DocumentStore,
    engine: Option<SyncEngine>,
    extract: ExtractOptions,
    staging_dir: PathBuf,
}

impl<'a> Publisher<'a> {
    pub fn new(config: &'a Config, store: &'a dyn DocumentStore) -> Self {
        Self {
            config,
            store,
            engine: None,
            extract: ExtractOptions {
                tag: config.publish.tag.clone(),
                excerpt_chars: config.publish.excerpt_chars,
                ..ExtractOptions::default()
            },
            staging_dir: config.output_dir(),
        }
    }

    pub fn with_engine(mut self, engine: SyncEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Run the whole pipeline; failures end up in the report, never as `Err`
    pub async fn publish(&self, mode: PublishMode) -> PublishReport {
        let mut report = PublishReport::default();
        match self.run(mode, &mut report).await {
            Ok(()) => {
                report.success = report.sync.as_ref().map_or(true, SyncResult::success);
            }
            Err(err) => {
                tracing::error!("{}", err);
                report.success = false;
                report.failure = Some(err.to_string());
            }
        }
        report
    }

    /// Extract and validate without persisting metadata or rendering
    pub fn verify(&self) -> Result<VerifyReport, PublishError> {
        let extraction = ItemExtractor::new(self.store, self.extract.clone()).extract()?;
        let validation = validate(&extraction.items);

        let mut diagnostics = extraction.diagnostics;
        diagnostics.extend(validation.diagnostics());
        Ok(VerifyReport {
            items: extraction.items.len(),
            pending_writes: extraction.pending.len(),
            diagnostics,
        })
    }

    async fn run(&self, mode: PublishMode, report: &mut PublishReport) -> Result<(), PublishError> {
        let extraction = ItemExtractor::new(self.store, self.extract.clone()).extract()?;
        report.diagnostics.extend(extraction.diagnostics);

        // Pending writes exist only for items with a confirmed identifier
        for pending in &extraction.pending {
            if let Err(diag) = self.persist(pending) {
                tracing::warn!(document = %pending.id, "{}", diag.message);
                report.diagnostics.push(diag);
            }
        }

        let validation = validate(&extraction.items);
        if !validation.is_ok() {
            report.diagnostics.extend(validation.diagnostics());
            return Err(PublishError::Validation(validation));
        }

        let items = extraction.items;
        report.items = items.len();
        if items.is_empty() {
            report.diagnostics.push(Diagnostic::warning(
                "site.empty",
                format!("No documents tagged '{}' to publish", self.extract.tag),
            ));
        }

        let rendered = RenderPipeline::new(SiteOptions::from_config(self.config)).render(items)?;
        report.staged = stage_outputs(&self.staging_dir, &rendered.files)?;

        if mode == PublishMode::StageOnly {
            return Ok(());
        }
        if rendered.items.is_empty() {
            tracing::warn!("Nothing to publish; remote left untouched");
            return Ok(());
        }

        let engine = self.engine.as_ref().ok_or_else(|| {
            PublishError::Configuration("remote sync requested without a remote".to_string())
        })?;
        match engine.sync(&rendered.files).await {
            Ok(result) => {
                report.sync = Some(result);
                Ok(())
            }
            Err(err) => {
                let err = PublishError::from(err);
                report.sync = Some(SyncResult::all_failed(paths(&rendered.files), &err.to_string()));
                Err(err)
            }
        }
    }

    /// Merge a metadata patch into one document and write it back
    fn persist(&self, pending: &PendingWrite) -> Result<(), Diagnostic> {
        let failed = |message: String| {
            Diagnostic::warning("metadata.write_failed", message).with_source(pending.id.as_str())
        };
        let text = self.store.read(&pending.id).map_err(|e| failed(e.to_string()))?;
        let merged = merge_frontmatter(&text, &pending.patch).map_err(|e| failed(e.to_string()))?;
        if merged != text {
            self.store
                .write(&pending.id, &merged)
                .map_err(|e| failed(e.to_string()))?;
            tracing::debug!(document = %pending.id, keys = pending.patch.len(), "Persisted metadata");
        }
        Ok(())
    }
}

fn paths(files: &[OutputFile]) -> impl Iterator<Item = &str> {
    files.iter().map(|f| f.path.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use vaultpress_core::store::MemoryStore;
    use vaultpress_sync::{MockRemoteRepository, RemoteError, RemoteTree, SyncOptions};

    fn config() -> Config {
        Config::from_yaml(
            r#"
site:
  title: "solidSpoon"
paths:
  vault: vault
remote:
  owner: solidspoon
  repo: solidspoon.github.io
"#,
        )
        .unwrap()
    }

    fn options() -> ExtractOptions {
        ExtractOptions {
            tag: "blog".into(),
            today: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            excerpt_chars: 200,
        }
    }

    fn engine(mock: MockRemoteRepository) -> SyncEngine {
        SyncEngine::new(Box::new(mock), SyncOptions::default())
    }

    fn staged(dir: &Path, path: &str) -> String {
        fs::read_to_string(dir.join(path)).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_duplicate_identifiers_abort_before_render_and_sync() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([
            ("Hello World.md", "---\ntags: [blog]\n---\nfirst"),
            ("drafts/Hello World.md", "---\ntags: [blog]\nmonth: 2401\n---\nsecond"),
        ]);
        // No expectations: any remote call fails the test
        let mock = MockRemoteRepository::new();

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path().join("site"))
            .with_engine(engine(mock))
            .publish(PublishMode::Sync)
            .await;

        assert!(!report.success);
        assert!(report.staged.is_empty());
        assert!(report.sync.is_none());
        assert!(!dir.path().join("site").exists());

        let collision = report
            .diagnostics
            .iter()
            .find(|d| d.code == "slug.collision")
            .unwrap();
        assert_eq!(collision.slug.as_deref(), Some("hello-world"));
        assert!(collision.message.contains("Hello World.md"));
        assert!(collision.message.contains("drafts/Hello World.md"));
        assert!(report.summary().starts_with("Publish aborted: duplicate identifiers"));
    }

    #[tokio::test]
    async fn test_han_title_publishes_under_transliterated_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([(
            "你好 World.md",
            "---\ntags: [blog]\nmonth: 2401\n---\n# 你好\n\nbody",
        )]);

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .publish(PublishMode::StageOnly)
            .await;

        assert!(report.success, "{}", report.summary());
        assert_eq!(report.items, 1);
        assert!(report.staged.contains(&"ni-hao-world.html".to_string()));

        let index = staged(dir.path(), "index.html");
        assert!(index.contains(r#"href="ni-hao-world.html""#));
        assert!(index.contains("2024-01"));

        // The derived identifier is written back; the stored month is kept
        let source = store.get("你好 World.md").unwrap();
        assert!(source.contains("slug: ni-hao-world"));
        assert!(source.contains("month: 2401"));
    }

    #[tokio::test]
    async fn test_detail_pages_link_to_adjacent_posts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([
            ("January.md", "---\ntags: [blog]\ndate: 2024-01\n---\njan"),
            ("February.md", "---\ntags: [blog]\ndate: 2024-02\n---\nfeb"),
        ]);

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .publish(PublishMode::StageOnly)
            .await;
        assert!(report.success);

        let index = staged(dir.path(), "index.html");
        assert!(index.find("february.html") < index.find("january.html"));

        let january = staged(dir.path(), "january.html");
        assert!(january.contains(r#"<a href="february.html" rel="next">"#));
        assert!(!january.contains(r#"rel="prev""#));
    }

    #[tokio::test]
    async fn test_sync_success_reports_commit() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([(
            "Post.md",
            "---\ntags: [blog]\nmonth: 2401\nslug: post\n---\nbody",
        )]);

        let mut mock = MockRemoteRepository::new();
        mock.expect_get_ref().returning(|_| Ok("c1".into()));
        mock.expect_get_commit_tree().returning(|_| Ok("t1".into()));
        mock.expect_get_tree().returning(|_| Ok(RemoteTree::default()));
        mock.expect_create_tree().times(1).returning(|_, entries| {
            let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
            assert_eq!(paths, vec!["index.html", "search.json", "post.html"]);
            Ok("t2".into())
        });
        mock.expect_create_commit().returning(|_, _, _| Ok("c2".into()));
        mock.expect_update_ref().times(1).returning(|_, _| Ok(()));

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .with_engine(engine(mock))
            .publish(PublishMode::Sync)
            .await;

        assert!(report.success, "{}", report.summary());
        let sync = report.sync.as_ref().unwrap();
        assert_eq!(sync.commit(), Some("c2"));
        assert_eq!(report.summary(), "Published 1 posts: 3 files written, 0 unchanged");
        // Nothing needed persisting
        assert_eq!(
            store.get("Post.md").unwrap(),
            "---\ntags: [blog]\nmonth: 2401\nslug: post\n---\nbody"
        );
    }

    #[tokio::test]
    async fn test_sync_failure_marks_every_file_failed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([(
            "Post.md",
            "---\ntags: [blog]\nmonth: 2401\n---\nbody",
        )]);

        let mut mock = MockRemoteRepository::new();
        mock.expect_get_ref().returning(|_| {
            Err(RemoteError::Api {
                status: 401,
                message: "Bad credentials".into(),
            })
        });

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .with_engine(engine(mock))
            .publish(PublishMode::Sync)
            .await;

        assert!(!report.success);
        let sync = report.sync.as_ref().unwrap();
        assert_eq!(sync.failed().count(), 3);
        assert!(report.failure.as_deref().unwrap_or_default().contains("Bad credentials"));
        // Staging still happened
        assert_eq!(report.staged.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_site_is_staged_but_not_pushed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([("Private.md", "---\ntags: [diary]\n---\nx")]);
        let mock = MockRemoteRepository::new();

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .with_engine(engine(mock))
            .publish(PublishMode::Sync)
            .await;

        assert!(report.success);
        assert!(report.sync.is_none());
        assert_eq!(report.count(DiagnosticSeverity::Warning), 1);
        assert_eq!(report.diagnostics[0].code, "site.empty");
    }

    #[tokio::test]
    async fn test_malformed_date_is_reported_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([
            ("Bad.md", "---\ntags: [blog]\nmonth: 2499\n---\nx"),
            ("Good.md", "---\ntags: [blog]\nmonth: 2401\n---\ny"),
        ]);

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .publish(PublishMode::StageOnly)
            .await;

        assert!(report.success);
        assert_eq!(report.items, 1);
        assert_eq!(report.diagnostics[0].code, "date.malformed");
        // The excluded document is left as it was
        assert_eq!(store.get("Bad.md").unwrap(), "---\ntags: [blog]\nmonth: 2499\n---\nx");
    }

    #[tokio::test]
    async fn test_sync_without_engine_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = MemoryStore::with_documents([(
            "Post.md",
            "---\ntags: [blog]\nmonth: 2401\n---\nbody",
        )]);

        let report = Publisher::new(&config, &store)
            .with_extract_options(options())
            .with_staging_dir(dir.path())
            .publish(PublishMode::Sync)
            .await;
        assert!(!report.success);
        assert!(report.summary().contains("Configuration error"));
    }

    #[test]
    fn test_verify_has_no_side_effects() {
        let config = config();
        let original = "---\ntags: [blog]\n---\nbody";
        let store = MemoryStore::with_documents([("A.md", original), ("a.md", original)]);

        let verify = Publisher::new(&config, &store)
            .with_extract_options(options())
            .verify()
            .unwrap();
        assert_eq!(verify.items, 2);
        assert_eq!(verify.pending_writes, 2);
        assert!(verify.diagnostics.iter().any(|d| d.code == "slug.collision"));
        assert_eq!(store.get("A.md").unwrap(), original);
    }
}
