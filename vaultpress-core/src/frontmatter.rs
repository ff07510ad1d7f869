//! Frontmatter parsing and write-back for markdown documents.

use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Frontmatter must be a mapping of keys to values")]
    NotAMapping,

    #[error("Cannot serialize value for key '{0}'")]
    Unserializable(String),
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"\A---[ \t]*\r?\n(?:(?s:(.*?))\r?\n)??---[ \t]*(\r?\n|\z)").unwrap()
    })
}

/// Ordered key/value metadata from a document's frontmatter block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Mapping);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Scalar value rendered as a string (strings, numbers and booleans)
    pub fn get_scalar(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// List value; a lone scalar counts as a one-element list
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Insert or overwrite a key, keeping the position of existing keys
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::String(key.to_string()), value.into());
    }

    /// Apply every key of `patch` on top of this map
    pub fn merge(&mut self, patch: &Metadata) {
        for (key, value) in &patch.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.0.keys().filter_map(scalar_to_string)
    }

    /// Serialize as a flat block body (without the `---` markers)
    pub fn to_block(&self) -> Result<String, FrontmatterError> {
        let mut out = String::new();
        for (key, value) in &self.0 {
            let key = scalar_to_string(key).ok_or(FrontmatterError::NotAMapping)?;
            let key_text = render_scalar(&key);
            match value {
                Value::Sequence(items) if !items.is_empty() => {
                    out.push_str(&format!("{}:\n", key_text));
                    for item in items {
                        out.push_str(&format!("  - {}\n", render_value(&key, item)?));
                    }
                }
                other => {
                    out.push_str(&format!("{}: {}\n", key_text, render_value(&key, other)?));
                }
            }
        }
        Ok(out)
    }
}

impl TryFrom<Value> for Metadata {
    type Error = FrontmatterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Metadata::new()),
            Value::Mapping(map) => Ok(Metadata(map)),
            _ => Err(FrontmatterError::NotAMapping),
        }
    }
}

/// Parse frontmatter from markdown content
///
/// Returns a tuple of (metadata, markdown_body).
/// If no frontmatter block is present, returns empty metadata with the full
/// content as body.
///
/// # Example
///
/// ```
/// use vaultpress_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntags:\n  - blog\nmonth: 2401\n---\n# Hello World\n";
///
/// let (meta, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(meta.get_list("tags"), vec!["blog"]);
/// assert_eq!(meta.get_scalar("month"), Some("2401".to_string()));
/// assert_eq!(body, "# Hello World\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Metadata, &str), FrontmatterError> {
    match frontmatter_regex().captures(content) {
        Some(captures) => {
            let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            let value: Value = serde_yaml::from_str(yaml)?;
            let metadata = Metadata::try_from(value)?;
            Ok((metadata, &content[block_end(&captures)..]))
        }
        None => Ok((Metadata::new(), content)),
    }
}

/// Remove the frontmatter block without interpreting it
pub fn strip_frontmatter(content: &str) -> &str {
    match frontmatter_regex().captures(content) {
        Some(captures) => &content[block_end(&captures)..],
        None => content,
    }
}

/// Merge `patch` into the document's frontmatter and return the new text
///
/// The whole resulting map is re-serialized. An existing block is replaced
/// in place; otherwise a new block is inserted before the original content.
/// Everything outside the block is kept byte-for-byte.
pub fn merge_frontmatter(content: &str, patch: &Metadata) -> Result<String, FrontmatterError> {
    let (mut metadata, _) = parse_frontmatter(content)?;
    metadata.merge(patch);
    let block = metadata.to_block()?;

    match frontmatter_regex().captures(content) {
        Some(captures) => {
            let terminator = captures.get(2).map(|m| m.as_str()).unwrap_or("");
            Ok(format!(
                "---\n{}---{}{}",
                block,
                terminator,
                &content[block_end(&captures)..]
            ))
        }
        None => Ok(format!("---\n{}---\n\n{}", block, content)),
    }
}

fn block_end(captures: &Captures<'_>) -> usize {
    captures.get(0).map(|m| m.end()).unwrap_or(0)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn render_value(key: &str, value: &Value) -> Result<String, FrontmatterError> {
    match value {
        Value::String(s) => Ok(render_scalar(s)),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => render_flow(key, other),
    }
}

/// Flow-style rendering for nested structures; strings are always quoted
fn render_flow(key: &str, value: &Value) -> Result<String, FrontmatterError> {
    let quote =
        |s: &str| serde_json::to_string(s).map_err(|_| FrontmatterError::Unserializable(key.into()));
    match value {
        Value::String(s) => quote(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Sequence(items) => {
            let rendered = items
                .iter()
                .map(|item| render_flow(key, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", rendered.join(", ")))
        }
        Value::Mapping(map) => {
            let mut rendered = Vec::with_capacity(map.len());
            for (k, v) in map {
                let k = scalar_to_string(k)
                    .ok_or_else(|| FrontmatterError::Unserializable(key.into()))?;
                rendered.push(format!("{}: {}", quote(&k)?, render_flow(key, v)?));
            }
            Ok(format!("{{{}}}", rendered.join(", ")))
        }
        Value::Tagged(tagged) => render_flow(key, &tagged.value),
    }
}

/// Plain scalar when it reads back as the same string, otherwise double-quoted
fn render_scalar(s: &str) -> String {
    if reads_back_as(s) {
        s.to_string()
    } else {
        serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
    }
}

fn reads_back_as(s: &str) -> bool {
    if s.is_empty() || s.trim() != s || s.chars().any(char::is_control) {
        return false;
    }
    match serde_yaml::from_str::<Value>(&format!("k: {}", s)) {
        Ok(Value::Mapping(map)) => {
            map.len() == 1 && map.get("k") == Some(&Value::String(s.to_string()))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(pairs: &[(&str, &str)]) -> Metadata {
        let mut meta = Metadata::new();
        for (k, v) in pairs {
            meta.insert(k, *v);
        }
        meta
    }

    #[test]
    fn test_parse_valid_frontmatter() {
        let content = "---\ntags:\n  - blog\n  - rust\nmonth: 2401\nslug: hello\n---\n\n# Hello\n";
        let (meta, body) = parse_frontmatter(content).unwrap();
        assert_eq!(meta.get_list("tags"), vec!["blog", "rust"]);
        assert_eq!(meta.get_scalar("month").as_deref(), Some("2401"));
        assert_eq!(meta.get_scalar("slug").as_deref(), Some("hello"));
        assert_eq!(body, "\n# Hello\n");
    }

    #[test]
    fn test_parse_no_frontmatter() {
        let content = "# Just Content\n\nNo frontmatter here.";
        let (meta, body) = parse_frontmatter(content).unwrap();
        assert!(meta.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_parse_empty_block() {
        let (meta, body) = parse_frontmatter("---\n---\nbody").unwrap();
        assert!(meta.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_marker_must_start_a_line() {
        let content = "---\ntitle: a---\nmore: b\n---\nbody";
        let (meta, body) = parse_frontmatter(content).unwrap();
        assert_eq!(meta.get_scalar("title").as_deref(), Some("a---"));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_single_tag_as_list() {
        let (meta, _) = parse_frontmatter("---\ntags: blog\n---\n").unwrap();
        assert_eq!(meta.get_list("tags"), vec!["blog"]);
    }

    #[test]
    fn test_invalid_yaml() {
        let content = "---\ntitle: Test\ninvalid yaml: [unclosed\n---\n\nContent.";
        assert!(parse_frontmatter(content).is_err());
    }

    #[test]
    fn test_not_a_mapping() {
        let content = "---\n- a\n- b\n---\nbody";
        assert!(matches!(
            parse_frontmatter(content),
            Err(FrontmatterError::NotAMapping)
        ));
    }

    #[test]
    fn test_strip_frontmatter() {
        assert_eq!(strip_frontmatter("---\na: 1\n---\nbody"), "body");
        assert_eq!(strip_frontmatter("body"), "body");
        assert_eq!(strip_frontmatter("---\n[bad\n---\nbody"), "body");
    }

    #[test]
    fn test_merge_inserts_block() {
        let merged = merge_frontmatter("Hello\n", &patch(&[("slug", "hello")])).unwrap();
        assert_eq!(merged, "---\nslug: hello\n---\n\nHello\n");
    }

    #[test]
    fn test_merge_replaces_block_in_place() {
        let content = "---\ntags:\n- blog\nmonth: 2401\n---\n\nBody with --- inside\n";
        let merged = merge_frontmatter(content, &patch(&[("slug", "hello-world")])).unwrap();
        assert_eq!(
            merged,
            "---\ntags:\n  - blog\nmonth: 2401\nslug: hello-world\n---\n\nBody with --- inside\n"
        );
    }

    #[test]
    fn test_merge_overwrites_existing_key_in_position() {
        let content = "---\nslug: old\ntags: [blog]\n---\nbody";
        let merged = merge_frontmatter(content, &patch(&[("slug", "new")])).unwrap();
        assert_eq!(merged, "---\nslug: new\ntags:\n  - blog\n---\nbody");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let inputs = [
            "plain body",
            "---\ntags: [blog]\n---\nbody",
            "---\ntitle: \"a: b\"\nflag: true\ncount: 3\n---\n\nbody\n",
            "---\n---\n",
        ];
        let p = patch(&[("slug", "hello-world"), ("note", "# not a comment")]);
        for input in inputs {
            let once = merge_frontmatter(input, &p).unwrap();
            let twice = merge_frontmatter(&once, &p).unwrap();
            assert_eq!(once, twice, "merge not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_round_trip_preserves_types() {
        let content = "---\ncount: 3\nflag: true\nquoted: \"123\"\nnested: {a: 1}\n---\n";
        let merged = merge_frontmatter(content, &Metadata::new()).unwrap();
        let (meta, _) = parse_frontmatter(&merged).unwrap();
        assert_eq!(meta.get("count"), Some(&Value::from(3)));
        assert_eq!(meta.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(meta.get("quoted"), Some(&Value::String("123".into())));
        assert!(matches!(meta.get("nested"), Some(Value::Mapping(_))));
    }

    #[test]
    fn test_render_scalar_quotes_when_needed() {
        assert_eq!(render_scalar("hello"), "hello");
        assert_eq!(render_scalar("a: b"), "\"a: b\"");
        assert_eq!(render_scalar("true"), "\"true\"");
        assert_eq!(render_scalar(""), "\"\"");
        assert_eq!(render_scalar("- item"), "\"- item\"");
    }
}
