//! Render validated items into the site's output files.

use crate::markdown::{MarkdownRenderer, RenderOptions};
use crate::outline::{build_outline, render_outline};
use crate::templates::{IndexTemplate, PostEntry, PostLink, PostTemplate};
use askama::Template;
use serde::Serialize;
use thiserror::Error;
use vaultpress_core::{Config, PublishItem};
use vaultpress_types::OutputFile;

pub const INDEX_PATH: &str = "index.html";
pub const SEARCH_INDEX_PATH: &str = "search.json";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template error while rendering {page}: {source}")]
    Template {
        page: String,
        #[source]
        source: askama::Error,
    },

    #[error("Failed to serialize search index: {0}")]
    SearchIndex(#[from] serde_json::Error),
}

/// Site-wide values shown on every page
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub title: String,
    pub description: String,
    pub github_username: Option<String>,
}

impl SiteOptions {
    pub fn from_config(config: &Config) -> Self {
        let owner = config.remote.owner.trim();
        Self {
            title: config.site.title.clone(),
            description: config.site.description.clone(),
            github_username: (!owner.is_empty()).then(|| owner.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchEntry<'a> {
    slug: &'a str,
    title: &'a str,
    date: &'a str,
    excerpt: &'a str,
    text: &'a str,
}

/// Items in list order plus the files rendered from them
#[derive(Debug, Clone)]
pub struct RenderedSite {
    /// Newest first, with `content_html` filled in
    pub items: Vec<PublishItem>,
    /// `index.html`, `search.json`, then one page per item in list order
    pub files: Vec<OutputFile>,
}

pub struct RenderPipeline {
    site: SiteOptions,
    options: RenderOptions,
    markdown: MarkdownRenderer,
}

impl RenderPipeline {
    pub fn new(site: SiteOptions) -> Self {
        Self {
            site,
            options: RenderOptions::default(),
            markdown: MarkdownRenderer::new(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Render the list page, search index and one detail page per item
    ///
    /// Items are sorted by date descending; the sort is stable so equal
    /// dates keep extraction order. Identical input gives byte-identical
    /// output.
    pub fn render(&self, mut items: Vec<PublishItem>) -> Result<RenderedSite, RenderError> {
        items.sort_by(|a, b| b.date.cmp(&a.date));

        let mut pages = Vec::with_capacity(items.len());
        for index in 0..items.len() {
            // prev = next-older, next = next-newer
            let prev_post = items.get(index + 1).map(link_to);
            let next_post = index.checked_sub(1).and_then(|i| items.get(i)).map(link_to);

            let item = &mut items[index];
            let options = self.options.clone().with_anchor_stamp(date_digits(&item.date));
            let body = self.markdown.render(&item.content, &options);
            item.content_html = body.html;

            let outline = build_outline(&body.headings);
            let page = PostTemplate {
                title: item.title.clone(),
                date: item.date.clone(),
                content: item.content_html.clone(),
                toc_html: render_outline(&outline),
                prev_post,
                next_post,
                site_title: self.site.title.clone(),
                github_username: self.site.github_username.clone(),
            };
            let path = item.output_rel_path();
            let html = page.render().map_err(|source| RenderError::Template {
                page: path.clone(),
                source,
            })?;
            tracing::debug!(slug = %item.slug, headings = body.headings.len(), "Rendered page");
            pages.push(OutputFile::new(path, html));
        }

        let index = IndexTemplate {
            site_title: self.site.title.clone(),
            site_description: self.site.description.clone(),
            github_username: self.site.github_username.clone(),
            posts: items
                .iter()
                .map(|item| PostEntry {
                    slug: item.slug.clone(),
                    title: item.title.clone(),
                    date: item.date.clone(),
                    excerpt: item.excerpt.clone(),
                })
                .collect(),
        }
        .render()
        .map_err(|source| RenderError::Template {
            page: INDEX_PATH.to_string(),
            source,
        })?;

        let search: Vec<SearchEntry> = items
            .iter()
            .map(|item| SearchEntry {
                slug: &item.slug,
                title: &item.title,
                date: &item.date,
                excerpt: &item.excerpt,
                text: &item.search_text,
            })
            .collect();
        let search_json = serde_json::to_vec_pretty(&search)?;

        let mut files = Vec::with_capacity(pages.len() + 2);
        files.push(OutputFile::new(INDEX_PATH, index));
        files.push(OutputFile::new(SEARCH_INDEX_PATH, search_json));
        files.extend(pages);

        tracing::info!(items = items.len(), files = files.len(), "Rendered site");
        Ok(RenderedSite { items, files })
    }
}

fn link_to(item: &PublishItem) -> PostLink {
    PostLink {
        title: item.title.clone(),
        slug: item.slug.clone(),
    }
}

fn date_digits(date: &str) -> String {
    date.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultpress_core::DocumentId;

    fn site() -> SiteOptions {
        SiteOptions {
            title: "solidSpoon".into(),
            description: "方向是比速度更重要的追求".into(),
            github_username: Some("solidspoon".into()),
        }
    }

    fn item(title: &str, slug: &str, date: &str, content: &str) -> PublishItem {
        PublishItem {
            slug: slug.into(),
            title: title.into(),
            date: date.into(),
            source: DocumentId::new(format!("{}.md", title)),
            content: content.into(),
            content_html: String::new(),
            excerpt: format!("about {}", title),
            search_text: content.into(),
        }
    }

    fn page<'a>(site: &'a RenderedSite, path: &str) -> &'a str {
        site.files
            .iter()
            .find(|f| f.path == path)
            .and_then(|f| f.as_str())
            .unwrap_or_else(|| panic!("missing {}", path))
    }

    #[test]
    fn test_output_order_and_paths() {
        let rendered = RenderPipeline::new(site())
            .render(vec![
                item("Older", "older", "2024-01", "old"),
                item("Newer", "newer", "2024-02", "new"),
            ])
            .unwrap();
        let paths: Vec<&str> = rendered.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["index.html", "search.json", "newer.html", "older.html"]
        );
    }

    #[test]
    fn test_adjacent_links() {
        let rendered = RenderPipeline::new(site())
            .render(vec![
                item("January", "january", "2024-01", "a"),
                item("February", "february", "2024-02", "b"),
            ])
            .unwrap();

        let index = page(&rendered, "index.html");
        let feb = index.find("february.html").unwrap();
        let jan = index.find("january.html").unwrap();
        assert!(feb < jan, "newest item must be listed first");

        // The older item has no prev and links forward to the newer one
        let january = page(&rendered, "january.html");
        assert!(january.contains(r#"<a href="february.html" rel="next">"#));
        assert!(!january.contains(r#"rel="prev""#));

        let february = page(&rendered, "february.html");
        assert!(february.contains(r#"<a href="january.html" rel="prev">"#));
        assert!(!february.contains(r#"rel="next""#));
    }

    #[test]
    fn test_stable_sort_for_equal_dates() {
        let rendered = RenderPipeline::new(site())
            .render(vec![
                item("First", "first", "2024-01", ""),
                item("Second", "second", "2024-01", ""),
                item("Third", "third", "2024-01", ""),
            ])
            .unwrap();
        let slugs: Vec<&str> = rendered.items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_day_precise_date_sorts_before_month_only() {
        let rendered = RenderPipeline::new(site())
            .render(vec![
                item("Month", "month-only", "2024-01", ""),
                item("Day", "day", "2024-01-15", ""),
                item("Earlier", "earlier", "2023-12-31", ""),
            ])
            .unwrap();
        let slugs: Vec<&str> = rendered.items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["day", "month-only", "earlier"]);
    }

    #[test]
    fn test_detail_page_content_and_outline() {
        let rendered = RenderPipeline::new(site())
            .render(vec![item(
                "Post",
                "post",
                "2024-01",
                "# Intro\n\nline one\nline two\n\n## Details",
            )])
            .unwrap();
        let html = page(&rendered, "post.html");
        assert!(html.contains("<title>Post - solidSpoon</title>"));
        assert!(html.contains("<h1 id=\"intro\">"));
        assert!(html.contains("line one<br />"));
        assert!(html.contains(r##"<a href="#details">Details</a>"##));
        assert!(html.contains("https://github.com/solidspoon"));
        assert!(rendered.items[0].content_html.contains("<h2 id=\"details\">"));
    }

    #[test]
    fn test_titles_are_escaped() {
        let rendered = RenderPipeline::new(site())
            .render(vec![item("<script>", "script", "2024-01", "x")])
            .unwrap();
        let index = page(&rendered, "index.html");
        assert!(index.contains("&lt;script&gt;"));
        assert!(!index.contains("<script>"));
    }

    #[test]
    fn test_search_index() {
        let rendered = RenderPipeline::new(site())
            .render(vec![item("Hello", "hello", "2024-01", "hello body")])
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&rendered.files[1].content).unwrap();
        assert_eq!(json[0]["slug"], "hello");
        assert_eq!(json[0]["text"], "hello body");
        assert_eq!(json[0]["excerpt"], "about Hello");
    }

    #[test]
    fn test_empty_item_set_renders_index() {
        let rendered = RenderPipeline::new(site()).render(Vec::new()).unwrap();
        assert_eq!(rendered.files.len(), 2);
        assert!(page(&rendered, "index.html").contains("方向是比速度更重要的追求"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let items = vec![
            item("A", "a", "2024-01", "# !!!\n\ntext"),
            item("B", "b", "2024-02", "body"),
        ];
        let pipeline = RenderPipeline::new(site());
        let first = pipeline.render(items.clone()).unwrap();
        let second = pipeline.render(items).unwrap();
        assert_eq!(first.files, second.files);
        assert!(page(&first, "a.html").contains("id=\"section-202401-1\""));
    }
}
