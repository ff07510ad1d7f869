//! Access to the host document store.

use crate::frontmatter::{parse_frontmatter, FrontmatterError, Metadata};
use crate::models::DocumentId;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Frontmatter error in {path}: {source}")]
    Frontmatter {
        path: String,
        #[source]
        source: FrontmatterError,
    },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// Enumerate, read and write tagged source documents.
pub trait DocumentStore: Send + Sync {
    /// Documents whose metadata tag list contains `tag`, in a stable order
    ///
    /// Documents whose metadata cannot be read are listed as well, so the
    /// caller can report them instead of losing them.
    fn list_tagged(&self, tag: &str) -> Result<Vec<DocumentId>, StoreError>;

    /// Raw document text, frontmatter included
    fn read(&self, id: &DocumentId) -> Result<String, StoreError>;

    /// Structured frontmatter of the document
    fn read_metadata(&self, id: &DocumentId) -> Result<Metadata, StoreError> {
        let text = self.read(id)?;
        parse_frontmatter(&text)
            .map(|(metadata, _)| metadata)
            .map_err(|source| StoreError::Frontmatter {
                path: id.to_string(),
                source,
            })
    }

    /// Replace the document text
    fn write(&self, id: &DocumentId, text: &str) -> Result<(), StoreError>;
}

/// True when the metadata's `tags` contain `tag` (leading `#` and case ignored)
pub fn has_tag(metadata: &Metadata, tag: &str) -> bool {
    let wanted = tag.trim_start_matches('#');
    metadata
        .get_list("tags")
        .iter()
        .any(|t| t.trim().trim_start_matches('#').eq_ignore_ascii_case(wanted))
}

/// Markdown files below a vault directory
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, id: &DocumentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn markdown_files(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|rel| DocumentId::new(rel.to_string_lossy().replace('\\', "/")))
            })
            .collect();
        ids.sort();
        ids
    }
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.len() > 1 && n.starts_with('.'))
}

impl DocumentStore for FsDocumentStore {
    fn list_tagged(&self, tag: &str) -> Result<Vec<DocumentId>, StoreError> {
        let files = self.markdown_files();
        tracing::debug!("Found {} markdown files under {:?}", files.len(), self.root);

        let mut tagged = Vec::new();
        for id in files {
            match self.read_metadata(&id) {
                Ok(metadata) if has_tag(&metadata, tag) => tagged.push(id),
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(document = %id, error = %err, "Listing unreadable document");
                    tagged.push(id);
                }
            }
        }
        Ok(tagged)
    }

    fn read(&self, id: &DocumentId) -> Result<String, StoreError> {
        let path = self.path_of(id);
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
            _ => StoreError::Io {
                path: id.to_string(),
                source,
            },
        })
    }

    fn write(&self, id: &DocumentId, text: &str) -> Result<(), StoreError> {
        let path = self.path_of(id);
        fs::write(&path, text).map_err(|source| StoreError::Io {
            path: id.to_string(),
            source,
        })
    }
}

/// In-memory store, handy for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<DocumentId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I, K, V>(docs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (id, text) in docs {
            store.insert(id, text);
        }
        store
    }

    pub fn insert(&self, id: impl Into<String>, text: impl Into<String>) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(DocumentId::new(id), text.into());
        }
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.docs
            .lock()
            .ok()
            .and_then(|docs| docs.get(&DocumentId::new(id)).cloned())
    }
}

impl DocumentStore for MemoryStore {
    fn list_tagged(&self, tag: &str) -> Result<Vec<DocumentId>, StoreError> {
        let docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        Ok(docs
            .iter()
            .filter(|(_, text)| {
                parse_frontmatter(text).map_or(true, |(metadata, _)| has_tag(&metadata, tag))
            })
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn read(&self, id: &DocumentId) -> Result<String, StoreError> {
        self.get(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn write(&self, id: &DocumentId, text: &str) -> Result<(), StoreError> {
        self.insert(id.as_str(), text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_has_tag() {
        let (meta, _) = parse_frontmatter("---\ntags: [Blog, rust]\n---\n").unwrap();
        assert!(has_tag(&meta, "blog"));
        assert!(has_tag(&meta, "#rust"));
        assert!(!has_tag(&meta, "draft"));

        let (meta, _) = parse_frontmatter("---\ntags: \"#blog\"\n---\n").unwrap();
        assert!(has_tag(&meta, "blog"));
    }

    #[test]
    fn test_fs_store_lists_tagged_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("posts"))?;
        fs::create_dir_all(dir.path().join(".obsidian"))?;
        fs::write(dir.path().join("posts/b.md"), "---\ntags: [blog]\n---\nB")?;
        fs::write(dir.path().join("a.md"), "---\ntags: [blog]\n---\nA")?;
        fs::write(dir.path().join("c.md"), "---\ntags: [other]\n---\nC")?;
        fs::write(dir.path().join("d.md"), "no frontmatter")?;
        fs::write(dir.path().join(".obsidian/e.md"), "---\ntags: [blog]\n---\nE")?;

        let store = FsDocumentStore::new(dir.path());
        let ids = store.list_tagged("blog")?;
        assert_eq!(
            ids,
            vec![DocumentId::new("a.md"), DocumentId::new("posts/b.md")]
        );
        Ok(())
    }

    #[test]
    fn test_fs_store_lists_unreadable_documents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("Bad Yaml.md"), "---\ntags: [blog]\nmonth: [2401\n---\nx")?;
        fs::write(dir.path().join("Latin1.md"), b"---\ntags: [blog]\n---\ncaf\xe9")?;
        fs::write(dir.path().join("Good.md"), "---\ntags: [blog]\n---\nok")?;
        fs::write(dir.path().join("Other.md"), "---\ntags: [diary]\n---\nno")?;

        let store = FsDocumentStore::new(dir.path());
        assert_eq!(
            store.list_tagged("blog")?,
            vec![
                DocumentId::new("Bad Yaml.md"),
                DocumentId::new("Good.md"),
                DocumentId::new("Latin1.md"),
            ]
        );
        assert!(matches!(
            store.read(&DocumentId::new("Latin1.md")),
            Err(StoreError::Io { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_fs_store_read_write() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = FsDocumentStore::new(dir.path());
        let id = DocumentId::new("note.md");
        store.write(&id, "---\nslug: x\n---\nbody")?;
        assert_eq!(store.read(&id)?, "---\nslug: x\n---\nbody");
        assert_eq!(store.read_metadata(&id)?.get_scalar("slug").as_deref(), Some("x"));
        assert!(matches!(
            store.read(&DocumentId::new("missing.md")),
            Err(StoreError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_memory_store() -> Result<(), StoreError> {
        let store = MemoryStore::with_documents([
            ("a.md", "---\ntags: [blog]\n---\nA"),
            ("b.md", "B"),
            ("c.md", "---\ntags: [blog\n---\nC"),
        ]);
        assert_eq!(
            store.list_tagged("blog")?,
            vec![DocumentId::new("a.md"), DocumentId::new("c.md")]
        );
        store.write(&DocumentId::new("b.md"), "changed")?;
        assert_eq!(store.get("b.md").as_deref(), Some("changed"));
        Ok(())
    }
}
