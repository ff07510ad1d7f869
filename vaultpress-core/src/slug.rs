//! Slug generation for mixed-script titles.

use pinyin::ToPinyin;

/// Slug used when a title has nothing left after normalization
pub const FALLBACK_SLUG: &str = "untitled";

/// Maps text containing non-Latin script into Latin tokens.
pub trait Transliterator: Send + Sync {
    /// Tone-insensitive token sequence for `text`, one token per source
    /// character. Characters the transliterator does not know are returned
    /// unchanged so the caller can treat them as separators.
    fn tokens(&self, text: &str) -> Vec<String>;
}

/// Han characters to tone-less pinyin
#[derive(Debug, Clone, Copy, Default)]
pub struct PinyinTransliterator;

impl Transliterator for PinyinTransliterator {
    fn tokens(&self, text: &str) -> Vec<String> {
        text.chars()
            .map(|c| match c.to_pinyin() {
                Some(p) => p.plain().to_string(),
                None => c.to_string(),
            })
            .collect()
    }
}

/// Convert a title to a URL-safe slug
///
/// Rules:
/// - Runs of ASCII letters and digits pass through
/// - Runs containing Han characters are transliterated, tokens joined by hyphens
/// - Any other run (whitespace, punctuation, symbols) becomes a hyphen
/// - Lowercase, collapse hyphens, trim hyphens
/// - Empty results become `untitled`
///
/// # Examples
///
/// ```
/// use vaultpress_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// assert_eq!(slugify("!!!"), "untitled");
/// ```
pub fn slugify(title: &str) -> String {
    slugify_with(title, &PinyinTransliterator)
}

/// Like [`slugify`] but with a caller-supplied transliterator
pub fn slugify_with(title: &str, transliterator: &dyn Transliterator) -> String {
    let parts: Vec<String> = segments(title)
        .into_iter()
        .map(|segment| match segment {
            Segment::Latin(run) => run.to_string(),
            Segment::Other(run) if run.chars().any(is_han) => {
                transliterator.tokens(run).join("-")
            }
            Segment::Other(_) => "-".to_string(),
        })
        .collect();

    let slug = collapse(&parts.join("-").to_lowercase());
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Like [`slugify_with`] but returns an empty string instead of the fallback
pub fn slug_or_empty(text: &str, transliterator: &dyn Transliterator) -> String {
    let slug = slugify_with(text, transliterator);
    if slug == FALLBACK_SLUG && collapse(&text.to_lowercase()) != FALLBACK_SLUG {
        String::new()
    } else {
        slug
    }
}

/// Check that a slug is non-empty `[a-z0-9]+(-[a-z0-9]+)*`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Latin(&'a str),
    Other(&'a str),
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn is_han(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Split into maximal runs of Latin characters versus everything else
fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (idx, c) in input.char_indices() {
        let latin = is_latin(c);
        match current {
            Some(prev) if prev != latin => {
                out.push(make_segment(&input[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        current = Some(latin);
    }
    if let Some(latin) = current {
        out.push(make_segment(&input[start..], latin));
    }
    out
}

fn make_segment(run: &str, latin: bool) -> Segment<'_> {
    if latin {
        Segment::Latin(run)
    } else {
        Segment::Other(run)
    }
}

/// Replace non `[a-z0-9]` runs with one hyphen and trim hyphens
fn collapse(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    out
}
