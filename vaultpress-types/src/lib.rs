//! Shared types for vaultpress
//!
//! This crate provides the value types that cross crate boundaries:
//! rendered output files, per-document diagnostics, and per-file
//! synchronization outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A rendered file destined for the site root (e.g. `index.html`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// Logical path relative to the site root, `/`-separated
    pub path: String,
    pub content: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Info,
    Warning,
    Error,
}

/// A problem found while processing one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `date.malformed`
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    /// Identity of the source document, if the problem is tied to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl Diagnostic {
    pub fn new(code: &str, severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity,
            source_path: None,
            slug: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, DiagnosticSeverity::Warning, message)
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(code, DiagnosticSeverity::Error, message)
    }

    pub fn with_source(mut self, source_path: impl Into<String>) -> Self {
        self.source_path = Some(source_path.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.severity, self.code)?;
        if let Some(slug) = &self.slug {
            write!(f, " [{}]", slug)?;
        }
        if let Some(source) = &self.source_path {
            write!(f, " ({})", source)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of converging one output file with the remote branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FileOutcome {
    Written,
    SkippedUnchanged,
    Failed { reason: String },
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Result of one synchronization run. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    files: Vec<FileResult>,
    success: bool,
    /// Commit created by the run, when the atomic mode wrote one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
}

impl SyncResult {
    pub fn new(files: Vec<FileResult>, commit: Option<String>) -> Self {
        let success = files.iter().all(|f| !f.outcome.is_failed());
        Self {
            files,
            success,
            commit,
        }
    }

    /// Mark every path as failed with the same reason
    pub fn all_failed<'a>(paths: impl IntoIterator<Item = &'a str>, reason: &str) -> Self {
        let files = paths
            .into_iter()
            .map(|path| FileResult {
                path: path.to_string(),
                outcome: FileOutcome::Failed {
                    reason: reason.to_string(),
                },
            })
            .collect();
        Self::new(files, None)
    }

    pub fn files(&self) -> &[FileResult] {
        &self.files
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileResult> {
        self.files.iter().filter(|f| f.outcome.is_failed())
    }

    pub fn count(&self, wanted: fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| wanted(&f.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_result_success_flag() {
        let ok = SyncResult::new(
            vec![
                FileResult {
                    path: "index.html".into(),
                    outcome: FileOutcome::Written,
                },
                FileResult {
                    path: "a.html".into(),
                    outcome: FileOutcome::SkippedUnchanged,
                },
            ],
            Some("abc".into()),
        );
        assert!(ok.success());
        assert_eq!(ok.failed().count(), 0);

        let bad = SyncResult::new(
            vec![FileResult {
                path: "a.html".into(),
                outcome: FileOutcome::Failed {
                    reason: "boom".into(),
                },
            }],
            None,
        );
        assert!(!bad.success());
        assert_eq!(bad.failed().count(), 1);
    }

    #[test]
    fn test_all_failed() {
        let result = SyncResult::all_failed(["index.html", "a.html"], "conflict");
        assert!(!result.success());
        assert_eq!(result.count(FileOutcome::is_failed), 2);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning("date.malformed", "bad month")
            .with_source("posts/a.md")
            .with_slug("a");
        assert_eq!(
            diag.to_string(),
            "Warning date.malformed [a] (posts/a.md): bad month"
        );
    }
}
