//! # vaultpress-render
//!
//! Rendering library for vaultpress.
//!
//! This crate turns validated items into the site's output files: markdown
//! to HTML via pulldown-cmark, heading outlines, and page layout with Askama.

pub mod markdown;
pub mod outline;
pub mod pipeline;
pub mod templates;

pub use markdown::{MarkdownRenderer, RenderOptions, RenderedBody};
pub use outline::{build_outline, render_outline, Heading, OutlineNode};
pub use pipeline::{RenderError, RenderPipeline, RenderedSite, SiteOptions, INDEX_PATH, SEARCH_INDEX_PATH};
pub use templates::{IndexTemplate, PostEntry, PostLink, PostTemplate};
