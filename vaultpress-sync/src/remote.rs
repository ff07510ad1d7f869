//! The remote repository seam: a minimal Git object model over one branch.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Regular, non-executable file mode
pub const BLOB_MODE: &str = "100644";

#[derive(Error, Debug)]
pub enum RemoteError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// The write was rejected because the target moved or already exists.
    #[error("Rejected as conflicting: {0}")]
    Conflict(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// One entry of a recursively listed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    /// `blob`, `tree` or `commit`
    pub kind: String,
    pub sha: String,
}

/// A root tree with every nested entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteTree {
    pub sha: String,
    pub entries: Vec<TreeEntry>,
    /// The listing was cut short by the remote; absent paths may exist
    pub truncated: bool,
}

impl RemoteTree {
    /// Blob id stored at `path`, if any
    pub fn blob_sha(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.kind == "blob" && e.path == path)
            .map(|e| e.sha.as_str())
    }
}

/// A file added to (or overwriting a path in) a new tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTreeEntry {
    pub path: String,
    pub content: Vec<u8>,
}

/// Current remote file at a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Blob id; required to replace the file
    pub sha: String,
    pub content: Vec<u8>,
}

/// Create-or-update of a single file on a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    pub branch: String,
    pub message: String,
    pub content: Vec<u8>,
    /// Blob id of the file being replaced; `None` creates the file
    pub sha: Option<String>,
}

/// Git-hosting operations the synchronization engine needs.
///
/// Every operation is scoped to one repository. Implemented by the GitHub
/// client and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Commit id the branch currently points at.
    async fn get_ref(&self, branch: &str) -> Result<String, RemoteError>;

    /// Root tree id of a commit.
    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String, RemoteError>;

    /// Recursive listing of a tree.
    async fn get_tree(&self, tree_sha: &str) -> Result<RemoteTree, RemoteError>;

    /// Create a tree from `base_tree` plus the given blob additions; returns its id.
    async fn create_tree(
        &self,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<String, RemoteError>;

    /// Create a commit; returns its id.
    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parents: Vec<String>,
    ) -> Result<String, RemoteError>;

    /// Move the branch to `commit_sha` without forcing.
    ///
    /// A non-fast-forward update is reported as [`RemoteError::Conflict`].
    async fn update_ref(&self, branch: &str, commit_sha: &str) -> Result<(), RemoteError>;

    /// File at `path` on `branch`; `Ok(None)` when the path does not exist.
    async fn get_content(&self, path: &str, branch: &str) -> Result<Option<RemoteFile>, RemoteError>;

    /// Create or replace a single file with its own commit.
    async fn put_content(&self, write: FileWrite) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_blob_lookup() {
        let tree = RemoteTree {
            sha: "t".into(),
            entries: vec![
                TreeEntry {
                    path: "posts".into(),
                    mode: "040000".into(),
                    kind: "tree".into(),
                    sha: "a".into(),
                },
                TreeEntry {
                    path: "index.html".into(),
                    mode: BLOB_MODE.into(),
                    kind: "blob".into(),
                    sha: "b".into(),
                },
            ],
            truncated: false,
        };
        assert_eq!(tree.blob_sha("index.html"), Some("b"));
        assert_eq!(tree.blob_sha("posts"), None);
        assert_eq!(tree.blob_sha("missing.html"), None);
    }
}
