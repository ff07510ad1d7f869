//! Content model structs for source documents and publishable items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a document in the store (its vault-relative path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem of the path, used as the display title
    pub fn title(&self) -> &str {
        let name = self.0.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(&self.0);
        name.strip_suffix(".md").unwrap_or(name)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single post extracted for one publish run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishItem {
    /// URL slug (e.g., "hello-world"), unique within a run once validated
    pub slug: String,

    /// Display title, derived from the document identity
    pub title: String,

    /// Normalized date, `YYYY-MM` or `YYYY-MM-DD`
    pub date: String,

    /// Source document this item came from
    pub source: DocumentId,

    /// Markdown body with the frontmatter block removed
    pub content: String,

    /// Rendered HTML content (filled by the render pipeline)
    #[serde(default)]
    pub content_html: String,

    /// Bounded plain-text preview
    pub excerpt: String,

    /// Markup-free, whitespace-collapsed body text
    pub search_text: String,
}

impl PublishItem {
    /// Relative output path for this item's page
    pub fn output_rel_path(&self) -> String {
        format!("{}.html", self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_title() {
        assert_eq!(DocumentId::new("posts/Hello World.md").title(), "Hello World");
        assert_eq!(DocumentId::new("你好 World.md").title(), "你好 World");
        assert_eq!(DocumentId::new("notes\\draft.md").title(), "draft");
        assert_eq!(DocumentId::new("plain").title(), "plain");
    }

    #[test]
    fn test_output_path() {
        let item = PublishItem {
            slug: "hello-world".into(),
            title: "Hello World".into(),
            date: "2024-01".into(),
            source: DocumentId::new("Hello World.md"),
            content: String::new(),
            content_html: String::new(),
            excerpt: String::new(),
            search_text: String::new(),
        };
        assert_eq!(item.output_rel_path(), "hello-world.html");
    }
}
