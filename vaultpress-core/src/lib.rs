//! # vaultpress-core
//!
//! Core library for the vaultpress blog publisher.
//!
//! This crate turns tagged documents from a document store into validated
//! publishable items: identifier generation, frontmatter read/write-back,
//! item extraction and duplicate-identifier detection.

pub mod config;
pub mod extract;
pub mod frontmatter;
pub mod models;
pub mod slug;
pub mod store;
pub mod text;
pub mod validate;

pub use config::{Config, ConfigError, RemoteConfig, SyncStrategy};
pub use extract::{Extraction, ExtractOptions, ItemExtractor, PendingWrite};
pub use frontmatter::{merge_frontmatter, parse_frontmatter, FrontmatterError, Metadata};
pub use models::{DocumentId, PublishItem};
pub use slug::{
    is_valid_slug, slug_or_empty, slugify, slugify_with, PinyinTransliterator, Transliterator,
};
pub use store::{DocumentStore, FsDocumentStore, MemoryStore, StoreError};
pub use validate::{validate, Collision, ValidationReport};
pub use vaultpress_types::{Diagnostic, DiagnosticSeverity};
