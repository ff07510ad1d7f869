//! Markdown to HTML with heading anchors.

use crate::outline::Heading;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;
use vaultpress_core::slug::{slug_or_empty, PinyinTransliterator, Transliterator};

/// Per-call rendering settings
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Turn single newlines into `<br />` (GitHub comment style)
    pub hard_breaks: bool,
    /// Append a `#` link to every heading
    pub heading_anchors: bool,
    /// Stamp used in fallback anchors for headings whose text has no slug
    pub anchor_stamp: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            hard_breaks: true,
            heading_anchors: true,
            anchor_stamp: String::new(),
        }
    }
}

impl RenderOptions {
    pub fn with_anchor_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.anchor_stamp = stamp.into();
        self
    }
}

/// HTML body plus the headings it contains, in document order
#[derive(Debug, Clone, Default)]
pub struct RenderedBody {
    pub html: String,
    pub headings: Vec<Heading>,
}

/// Markdown renderer with GitHub-flavored extensions
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render a markdown body; frontmatter must already be stripped
    pub fn render(&self, markdown: &str, render: &RenderOptions) -> RenderedBody {
        self.render_with(markdown, render, &PinyinTransliterator)
    }

    pub fn render_with(
        &self,
        markdown: &str,
        render: &RenderOptions,
        transliterator: &dyn Transliterator,
    ) -> RenderedBody {
        let events: Vec<Event> = Parser::new_ext(markdown, self.options)
            .map(|event| match event {
                Event::SoftBreak if render.hard_breaks => Event::HardBreak,
                other => other,
            })
            .collect();

        let headings = collect_headings(&events, &render.anchor_stamp, transliterator);
        let events = attach_heading_ids(events, &headings, render.heading_anchors);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        RenderedBody {
            html: html_output,
            headings,
        }
    }

    /// Render without heading metadata
    pub fn render_simple(&self, markdown: &str) -> String {
        self.render(markdown, &RenderOptions::default()).html
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk heading events and assign each heading a page-unique anchor
///
/// Explicit `{#id}` attributes are kept as-is. Other anchors come from the
/// heading text; text without a slug falls back to `section-<stamp>-<n>`
/// where `n` is the 1-based heading ordinal. Repeats get `-1`, `-2`, ...
fn collect_headings(
    events: &[Event],
    stamp: &str,
    transliterator: &dyn Transliterator,
) -> Vec<Heading> {
    let mut raw: Vec<(u8, String, Option<String>)> = Vec::new();
    let mut current: Option<(u8, String, Option<String>)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((*level as u8, String::new(), id.as_ref().map(|s| s.to_string())));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut title, _)) = current {
                    title.push_str(text.as_ref());
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = current.take() {
                    raw.push(heading);
                }
            }
            _ => {}
        }
    }

    let mut used: HashSet<String> = raw.iter().filter_map(|(_, _, id)| id.clone()).collect();
    raw.into_iter()
        .enumerate()
        .map(|(index, (level, text, explicit))| {
            let text = text.trim().to_string();
            let anchor = match explicit {
                Some(id) => id,
                None => {
                    let base = match slug_or_empty(&text, transliterator) {
                        slug if !slug.is_empty() => slug,
                        _ if stamp.is_empty() => format!("section-{}", index + 1),
                        _ => format!("section-{}-{}", stamp, index + 1),
                    };
                    unique_anchor(base, &mut used)
                }
            };
            Heading {
                level,
                text,
                anchor,
            }
        })
        .collect()
}

fn unique_anchor(base: String, used: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Give each heading its anchor id, optionally followed by a `#` self-link
fn attach_heading_ids<'a>(
    events: Vec<Event<'a>>,
    headings: &[Heading],
    self_links: bool,
) -> Vec<Event<'a>> {
    let mut pending = headings.iter();
    let mut open: Option<&Heading> = None;
    let mut result = Vec::with_capacity(events.len() + headings.len());

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                open = pending.next();
                let id = open
                    .map(|h| CowStr::Boxed(h.anchor.clone().into_boxed_str()))
                    .or(id);
                result.push(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }));
            }
            Event::End(TagEnd::Heading(level)) => {
                if let Some(heading) = open.take().filter(|_| self_links) {
                    let link = format!(
                        r##"<a class="heading-anchor" href="#{}" aria-label="Link to heading">#</a>"##,
                        html_escape(&heading.anchor)
                    );
                    result.push(Event::Html(link.into()));
                }
                result.push(Event::End(TagEnd::Heading(level)));
            }
            other => result.push(other),
        }
    }

    result
}

/// Escape text for HTML bodies and double- or single-quoted attributes
pub(crate) fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
