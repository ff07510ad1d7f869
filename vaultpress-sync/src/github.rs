//! GitHub REST implementation of [`RemoteRepository`].

use crate::remote::{
    FileWrite, NewTreeEntry, RemoteError, RemoteFile, RemoteRepository, RemoteTree, TreeEntry,
    BLOB_MODE,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vaultpress_core::RemoteConfig;

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one `owner/repo` on a GitHub-compatible API
pub struct GitHubClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl GitHubClient {
    /// Build a client from remote settings
    ///
    /// The settings are expected to have passed [`RemoteConfig::validate`].
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(concat!("vaultpress/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base: repo_base(&config.api_url, &config.owner, &config.repo),
            token: config.token.clone().unwrap_or_default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, RemoteError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(check_response(resp).await?).await
    }

    async fn send_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let resp = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        decode(check_response(resp).await?).await
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String, RemoteError> {
        let body = serde_json::json!({
            "content": STANDARD.encode(content),
            "encoding": "base64",
        });
        let created: ShaOnly = self
            .send_json(reqwest::Method::POST, "git/blobs", &body)
            .await?;
        Ok(created.sha)
    }
}

fn repo_base(api_url: &str, owner: &str, repo: &str) -> String {
    format!("{}/repos/{}/{}", api_url.trim_end_matches('/'), owner, repo)
}

/// Map non-success statuses onto [`RemoteError`]
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().path().to_string();
    let message = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(url),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Conflict(format!("{}: {}", url, message))
        }
        _ => RemoteError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Decode the contents API's line-wrapped base64
fn decode_content(encoded: &str) -> Result<Vec<u8>, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(format!("file content: {}", e)))
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaOnly,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaOnly,
}

#[derive(Deserialize)]
struct TreeResponse {
    sha: String,
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Serialize)]
struct NewTree<'a> {
    base_tree: &'a str,
    tree: Vec<NewTreeItem>,
}

#[derive(Debug, PartialEq, Serialize)]
struct NewTreeItem {
    path: String,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Serialize)]
struct NewCommit<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<String>,
}

#[derive(Serialize)]
struct RefUpdate<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Deserialize)]
struct ContentResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct ContentWrite<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[async_trait]
impl RemoteRepository for GitHubClient {
    async fn get_ref(&self, branch: &str) -> Result<String, RemoteError> {
        let reference: RefResponse = self.get_json(&format!("git/ref/heads/{}", branch)).await?;
        Ok(reference.object.sha)
    }

    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String, RemoteError> {
        let commit: CommitResponse = self.get_json(&format!("git/commits/{}", commit_sha)).await?;
        Ok(commit.tree.sha)
    }

    async fn get_tree(&self, tree_sha: &str) -> Result<RemoteTree, RemoteError> {
        let tree: TreeResponse = self
            .get_json(&format!("git/trees/{}?recursive=1", tree_sha))
            .await?;
        if tree.truncated {
            tracing::warn!(tree = %tree_sha, "Remote tree listing is truncated");
        }
        Ok(RemoteTree {
            sha: tree.sha,
            entries: tree
                .tree
                .into_iter()
                .map(|item| TreeEntry {
                    path: item.path,
                    mode: item.mode,
                    kind: item.kind,
                    sha: item.sha,
                })
                .collect(),
            truncated: tree.truncated,
        })
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<String, RemoteError> {
        let mut tree = Vec::with_capacity(entries.len());
        for entry in entries {
            // Inline content must be text; anything else goes through a blob
            let item = match String::from_utf8(entry.content) {
                Ok(text) => NewTreeItem {
                    path: entry.path,
                    mode: BLOB_MODE,
                    kind: "blob",
                    content: Some(text),
                    sha: None,
                },
                Err(err) => NewTreeItem {
                    sha: Some(self.create_blob(err.as_bytes()).await?),
                    path: entry.path,
                    mode: BLOB_MODE,
                    kind: "blob",
                    content: None,
                },
            };
            tree.push(item);
        }

        let created: ShaOnly = self
            .send_json(
                reqwest::Method::POST,
                "git/trees",
                &NewTree { base_tree, tree },
            )
            .await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parents: Vec<String>,
    ) -> Result<String, RemoteError> {
        let created: ShaOnly = self
            .send_json(
                reqwest::Method::POST,
                "git/commits",
                &NewCommit {
                    message,
                    tree: tree_sha,
                    parents,
                },
            )
            .await?;
        Ok(created.sha)
    }

    async fn update_ref(&self, branch: &str, commit_sha: &str) -> Result<(), RemoteError> {
        let _: serde_json::Value = self
            .send_json(
                reqwest::Method::PATCH,
                &format!("git/refs/heads/{}", branch),
                &RefUpdate {
                    sha: commit_sha,
                    force: false,
                },
            )
            .await?;
        Ok(())
    }

    async fn get_content(&self, path: &str, branch: &str) -> Result<Option<RemoteFile>, RemoteError> {
        let found: Result<ContentResponse, RemoteError> = self
            .get_json(&format!("contents/{}?ref={}", path, branch))
            .await;
        match found {
            Ok(file) => Ok(Some(RemoteFile {
                content: decode_content(&file.content)?,
                sha: file.sha,
            })),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn put_content(&self, write: FileWrite) -> Result<(), RemoteError> {
        let body = ContentWrite {
            message: &write.message,
            content: STANDARD.encode(&write.content),
            branch: &write.branch,
            sha: write.sha.as_deref(),
        };
        let _: serde_json::Value = self
            .send_json(
                reqwest::Method::PUT,
                &format!("contents/{}", write.path),
                &body,
            )
            .await?;
        Ok(())
    }
}
