//! Duplicate-identifier detection across an extracted item set.

use crate::models::PublishItem;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use vaultpress_types::Diagnostic;

/// One document taking part in a collision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionEntry {
    pub title: String,
    pub source_path: String,
}

/// Several items resolving to the same identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub slug: String,
    pub entries: Vec<CollisionEntry>,
}

impl Collision {
    pub fn titles(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.title.as_str()).collect()
    }
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let titles: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("\"{}\" ({})", e.title, e.source_path))
            .collect();
        write!(f, "'{}' is used by {}", self.slug, titles.join(", "))
    }
}

/// Result of [`validate`]; any collision blocks the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub collisions: Vec<Collision>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.collisions.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.collisions
            .iter()
            .map(|c| {
                let mut diag = Diagnostic::error("slug.collision", c.to_string()).with_slug(&c.slug);
                if let Some(first) = c.entries.first() {
                    diag = diag.with_source(&first.source_path);
                }
                diag
            })
            .collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.collisions.iter().map(|c| c.to_string()).collect();
        write!(f, "duplicate identifiers: {}", lines.join("; "))
    }
}

/// Group items by slug and report every group with more than one member
///
/// Collisions are listed in order of first appearance, entries in
/// extraction order.
pub fn validate(items: &[PublishItem]) -> ValidationReport {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&PublishItem>> = HashMap::new();

    for item in items {
        let group = groups.entry(item.slug.as_str()).or_default();
        if group.is_empty() {
            order.push(item.slug.as_str());
        }
        group.push(item);
    }

    let collisions = order
        .into_iter()
        .filter_map(|slug| {
            let group = groups.get(slug)?;
            (group.len() > 1).then(|| Collision {
                slug: slug.to_string(),
                entries: group
                    .iter()
                    .map(|item| CollisionEntry {
                        title: item.title.clone(),
                        source_path: item.source.to_string(),
                    })
                    .collect(),
            })
        })
        .collect::<Vec<_>>();

    if !collisions.is_empty() {
        tracing::warn!("Found {} duplicate identifiers", collisions.len());
    }

    ValidationReport { collisions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentId;

    fn item(slug: &str, source: &str) -> PublishItem {
        let id = DocumentId::new(source);
        PublishItem {
            slug: slug.into(),
            title: id.title().to_string(),
            date: "2024-01".into(),
            source: id,
            content: String::new(),
            content_html: String::new(),
            excerpt: String::new(),
            search_text: String::new(),
        }
    }

    #[test]
    fn test_no_collisions() {
        let report = validate(&[item("a", "a.md"), item("b", "b.md")]);
        assert!(report.is_ok());
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn test_single_collision_names_both_titles() {
        let report = validate(&[
            item("hello-world", "Hello World.md"),
            item("other", "other.md"),
            item("hello-world", "drafts/Hello World.md"),
        ]);
        assert!(!report.is_ok());
        assert_eq!(report.collisions.len(), 1);
        let collision = &report.collisions[0];
        assert_eq!(collision.slug, "hello-world");
        assert_eq!(collision.titles(), vec!["Hello World", "Hello World"]);
        assert_eq!(collision.entries[1].source_path, "drafts/Hello World.md");
    }

    #[test]
    fn test_reports_every_collision_in_order() {
        let report = validate(&[
            item("b", "b1.md"),
            item("a", "a1.md"),
            item("a", "a2.md"),
            item("b", "b2.md"),
            item("a", "a3.md"),
        ]);
        let slugs: Vec<&str> = report.collisions.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "a"]);
        assert_eq!(report.collisions[1].entries.len(), 3);

        let diags = report.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].code, "slug.collision");
        assert_eq!(diags[0].slug.as_deref(), Some("b"));
    }
}
