//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Main configuration struct matching the vaultpress.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    pub paths: PathsConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_title")]
    pub title: String,

    #[serde(default = "default_description")]
    pub description: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

fn default_site_title() -> String {
    String::from("My Blog")
}

fn default_description() -> String {
    String::from("我的个人博客")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            description: default_description(),
            author: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub vault: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_output() -> PathBuf {
    PathBuf::from("site")
}

/// How remote convergence is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    /// One commit for all files; the branch moves past all changes or none
    #[default]
    Atomic,
    /// Independent create-or-update per file; not atomic
    PerFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Push to the remote; false stages output locally only
    #[serde(default = "default_true")]
    pub sync: bool,

    #[serde(default)]
    pub mode: SyncStrategy,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    #[serde(default)]
    pub commit_message: Option<String>,
}

fn default_tag() -> String {
    String::from("blog")
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_excerpt_chars() -> usize {
    200
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            sync: true,
            mode: SyncStrategy::default(),
            concurrency: default_concurrency(),
            excerpt_chars: default_excerpt_chars(),
            commit_message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_branch() -> String {
    String::from("main")
}

fn default_api_url() -> String {
    String::from("https://api.github.com")
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            token: None,
            api_url: default_api_url(),
        }
    }
}

impl RemoteConfig {
    /// Fail fast when credential, owner, repository or branch is missing
    pub fn validate(&self) -> Result<(), ConfigError> {
        let token = self.token.as_deref().unwrap_or("");
        for (field, value) in [
            ("remote.token", token),
            ("remote.owner", self.owner.as_str()),
            ("remote.repo", self.repo.as_str()),
            ("remote.branch", self.branch.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Get the vault directory, resolved relative to config file
    pub fn vault_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.vault)
    }

    /// Get the staging output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_deref().and_then(Path::parent) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Get a nested config value using dotted path (e.g., "site.title")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["site", "title"] => Some(self.site.title.clone()),
            ["site", "description"] => Some(self.site.description.clone()),
            ["site", "author"] => self.site.author.clone(),
            ["site", "url"] => self.site.url.clone(),
            ["paths", "vault"] => Some(self.vault_dir().display().to_string()),
            ["paths", "output"] => Some(self.output_dir().display().to_string()),
            ["publish", "tag"] => Some(self.publish.tag.clone()),
            ["publish", "sync"] => Some(self.publish.sync.to_string()),
            ["publish", "mode"] => Some(
                match self.publish.mode {
                    SyncStrategy::Atomic => "atomic",
                    SyncStrategy::PerFile => "per-file",
                }
                .to_string(),
            ),
            ["publish", "concurrency"] => Some(self.publish.concurrency.to_string()),
            ["remote", "owner"] => Some(self.remote.owner.clone()),
            ["remote", "repo"] => Some(self.remote.repo.clone()),
            ["remote", "branch"] => Some(self.remote.branch.clone()),
            ["remote", "api_url"] => Some(self.remote.api_url.clone()),
            // remote.token is never echoed
            _ => None,
        }
    }
}
