//! Converge a remote branch with a set of output files.

use crate::github::GitHubClient;
use crate::remote::{FileWrite, NewTreeEntry, RemoteError, RemoteRepository};
use futures::stream::{self, StreamExt};
use sha1::{Digest, Sha1};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use vaultpress_core::config::{Config, ConfigError, RemoteConfig, SyncStrategy};
use vaultpress_types::{FileOutcome, FileResult, OutputFile, SyncResult};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote configuration incomplete: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Branch '{branch}' moved during publish: {detail}")]
    Conflict { branch: String, detail: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Synchronization cancelled before the branch was updated")]
    Cancelled,
}

/// How the remote is brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// All changed files land in one commit, or none do
    #[default]
    Atomic,
    /// Each file is written independently. Not atomic: some files may be
    /// written while others fail.
    PerFile,
}

impl From<SyncStrategy> for SyncMode {
    fn from(strategy: SyncStrategy) -> Self {
        match strategy {
            SyncStrategy::Atomic => SyncMode::Atomic,
            SyncStrategy::PerFile => SyncMode::PerFile,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    pub branch: String,
    /// Upper bound on in-flight requests in per-file mode
    pub concurrency: usize,
    /// Defaults to `Update N files`
    pub commit_message: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            branch: "main".to_string(),
            concurrency: 4,
            commit_message: None,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.publish.mode.into(),
            branch: config.remote.branch.clone(),
            concurrency: config.publish.concurrency,
            commit_message: config.publish.commit_message.clone(),
        }
    }
}

/// Cooperative cancellation shared between the caller and the engine
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Git blob id of `content`: `sha1("blob <len>\0" + content)`
pub fn git_blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

pub struct SyncEngine {
    remote: Box<dyn RemoteRepository>,
    options: SyncOptions,
    cancel: CancelFlag,
}

impl SyncEngine {
    pub fn new(remote: Box<dyn RemoteRepository>, options: SyncOptions) -> Self {
        Self {
            remote,
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Engine talking to GitHub, after checking the remote settings
    ///
    /// Fails before any network call when credential, owner, repository or
    /// branch is missing.
    pub fn github(remote: &RemoteConfig, options: SyncOptions) -> Result<Self, SyncError> {
        remote.validate()?;
        tracing::debug!(
            owner = %remote.owner,
            repo = %remote.repo,
            branch = %remote.branch,
            token_set = remote.token.is_some(),
            "Configured GitHub remote"
        );
        let client = GitHubClient::new(remote)?;
        Ok(Self::new(Box::new(client), options))
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn mode(&self) -> SyncMode {
        self.options.mode
    }

    /// Bring the branch in line with `files`
    ///
    /// Paths not named in `files` are never touched. In atomic mode an
    /// `Err` means the branch was not moved; in per-file mode failures are
    /// reported per file in the result.
    pub async fn sync(&self, files: &[OutputFile]) -> Result<SyncResult, SyncError> {
        if self.options.branch.trim().is_empty() {
            return Err(ConfigError::MissingField("remote.branch".to_string()).into());
        }
        tracing::info!(
            files = files.len(),
            branch = %self.options.branch,
            mode = ?self.options.mode,
            "Synchronizing remote"
        );

        let result = match self.options.mode {
            SyncMode::Atomic => self.sync_atomic(files).await?,
            SyncMode::PerFile => self.sync_per_file(files).await,
        };

        let written = result.count(|o| matches!(o, FileOutcome::Written));
        let skipped = result.count(|o| matches!(o, FileOutcome::SkippedUnchanged));
        let failed = result.failed().count();
        if failed > 0 {
            tracing::warn!(written, skipped, failed, "Synchronization finished with failures");
        } else {
            tracing::info!(written, skipped, commit = ?result.commit(), "Synchronization finished");
        }
        Ok(result)
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn sync_atomic(&self, files: &[OutputFile]) -> Result<SyncResult, SyncError> {
        let branch = self.options.branch.as_str();

        self.check_cancelled()?;
        let head = self.remote.get_ref(branch).await?;
        self.check_cancelled()?;
        let base_tree = self.remote.get_commit_tree(&head).await?;
        let tree = self.remote.get_tree(&base_tree).await?;
        tracing::debug!(head = %head, tree = %base_tree, entries = tree.entries.len(), "Read remote tree");

        let mut outcomes = Vec::with_capacity(files.len());
        let mut changed = Vec::new();
        for file in files {
            let unchanged = tree
                .blob_sha(&file.path)
                .is_some_and(|sha| sha == git_blob_sha(&file.content));
            if unchanged {
                tracing::debug!(path = %file.path, "Unchanged");
                outcomes.push(FileOutcome::SkippedUnchanged);
            } else {
                changed.push(NewTreeEntry {
                    path: file.path.clone(),
                    content: file.content.clone(),
                });
                outcomes.push(FileOutcome::Written);
            }
        }

        if changed.is_empty() {
            tracing::info!("Remote already up to date; nothing to commit");
            return Ok(SyncResult::new(zip_results(files, outcomes), None));
        }

        let message = self
            .options
            .commit_message
            .clone()
            .unwrap_or_else(|| format!("Update {} files", changed.len()));

        self.check_cancelled()?;
        let new_tree = self.remote.create_tree(&base_tree, changed).await?;
        self.check_cancelled()?;
        let commit = self
            .remote
            .create_commit(&message, &new_tree, vec![head.clone()])
            .await?;

        // Last chance to stop; past this point the update cannot be undone
        self.check_cancelled()?;
        let current = self.remote.get_ref(branch).await?;
        if current != head {
            return Err(SyncError::Conflict {
                branch: branch.to_string(),
                detail: format!("expected {}, found {}", head, current),
            });
        }

        self.remote
            .update_ref(branch, &commit)
            .await
            .map_err(|err| match err {
                RemoteError::Conflict(detail) => SyncError::Conflict {
                    branch: branch.to_string(),
                    detail,
                },
                other => SyncError::Remote(other),
            })?;

        tracing::info!(commit = %commit, "Branch updated");
        Ok(SyncResult::new(zip_results(files, outcomes), Some(commit)))
    }

    async fn sync_per_file(&self, files: &[OutputFile]) -> SyncResult {
        let concurrency = self.options.concurrency.max(1);
        let results: Vec<FileResult> = stream::iter(files.iter().map(|file| async move {
            FileResult {
                path: file.path.clone(),
                outcome: self.sync_one(file).await,
            }
        }))
        .buffered(concurrency)
        .collect()
        .await;

        SyncResult::new(results, None)
    }

    async fn sync_one(&self, file: &OutputFile) -> FileOutcome {
        if let Err(err) = self.check_cancelled() {
            return FileOutcome::Failed {
                reason: err.to_string(),
            };
        }

        let branch = &self.options.branch;
        let existing = match self.remote.get_content(&file.path, branch).await {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!(path = %file.path, error = %err, "Failed to read remote file");
                return FileOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let sha = match existing {
            Some(remote) if remote.content == file.content => {
                tracing::debug!(path = %file.path, "Unchanged");
                return FileOutcome::SkippedUnchanged;
            }
            Some(remote) => Some(remote.sha),
            None => None,
        };

        if let Err(err) = self.check_cancelled() {
            tracing::debug!(path = %file.path, "Cancelled before write");
            return FileOutcome::Failed {
                reason: err.to_string(),
            };
        }

        let write = FileWrite {
            path: file.path.clone(),
            branch: branch.clone(),
            message: self
                .options
                .commit_message
                .clone()
                .unwrap_or_else(|| format!("Update {}", file.path)),
            content: file.content.clone(),
            sha,
        };
        match self.remote.put_content(write).await {
            Ok(()) => {
                tracing::debug!(path = %file.path, "Written");
                FileOutcome::Written
            }
            Err(err) => {
                tracing::warn!(path = %file.path, error = %err, "Failed to write remote file");
                FileOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn zip_results(files: &[OutputFile], outcomes: Vec<FileOutcome>) -> Vec<FileResult> {
    files
        .iter()
        .zip(outcomes)
        .map(|(file, outcome)| FileResult {
            path: file.path.clone(),
            outcome,
        })
        .collect()
}
