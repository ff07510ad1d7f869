//! # vaultpress-sync
//!
//! Pushes rendered output to a Git-hosted repository.
//!
//! The [`SyncEngine`] converges one branch with a set of output files,
//! either in a single atomic commit (the default) or with independent
//! per-file writes. Remote access goes through the [`RemoteRepository`]
//! trait; [`GitHubClient`] implements it over the GitHub REST API.

pub mod engine;
pub mod github;
pub mod remote;

pub use engine::{git_blob_sha, CancelFlag, SyncEngine, SyncError, SyncMode, SyncOptions};
pub use github::GitHubClient;
pub use remote::{
    FileWrite, NewTreeEntry, RemoteError, RemoteFile, RemoteRepository, RemoteTree, TreeEntry,
};

#[cfg(any(test, feature = "test-export-mocks"))]
pub use remote::MockRemoteRepository;
