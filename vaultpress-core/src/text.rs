//! Plain-text derivation for excerpts and search.

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    image: Regex,
    embed: Regex,
    wikilink: Regex,
    link: Regex,
    html_tag: Regex,
    fence: Regex,
    line_marker: Regex,
    emphasis: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        image: Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap(),
        embed: Regex::new(r"!\[\[[^\]]*\]\]").unwrap(),
        wikilink: Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]]*)\]\]").unwrap(),
        link: Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap(),
        html_tag: Regex::new(r"</?[A-Za-z][^>]*>").unwrap(),
        fence: Regex::new(r"(?m)^\s*(```|~~~).*$").unwrap(),
        line_marker: Regex::new(r"(?m)^\s{0,3}(#{1,6}\s+|>\s?|[-*+]\s+|\d+\.\s+)").unwrap(),
        emphasis: Regex::new(r"[*_~`]+").unwrap(),
    })
}

/// Strip images, embeds, links, HTML and inline markup from a markdown body
///
/// Link text is kept, link targets are dropped. Whitespace (including
/// newlines) is collapsed to single spaces.
pub fn markdown_to_text(markdown: &str) -> String {
    let p = patterns();
    let text = p.image.replace_all(markdown, " ");
    let text = p.embed.replace_all(&text, " ");
    let text = p.wikilink.replace_all(&text, "$1");
    let text = p.link.replace_all(&text, "$1");
    let text = p.html_tag.replace_all(&text, " ");
    let text = p.fence.replace_all(&text, " ");
    let text = p.line_marker.replace_all(&text, "");
    let text = p.emphasis.replace_all(&text, "");
    collapse_whitespace(&text)
}

/// Collapse every whitespace run to one space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters on a word boundary
pub fn create_snippet(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    // Find last space within limit
    let truncated: String = chars[..max_chars].iter().collect();
    if let Some(last_space) = truncated.rfind(' ') {
        format!("{}...", truncated[..last_space].trim_end())
    } else {
        format!("{}...", truncated)
    }
}
