//! Content collection adapters.
//!
//! This crate provides:
//! - [`DocumentSource`]: the read-only contract the rest of docsets consumes
//! - [`DirectorySource`]: Markdown files with YAML frontmatter on disk
//! - [`JsonSnapshotSource`]: a previously exported `docs.json`
//! - [`MemorySource`]: an in-memory collection
//!
//! Every source yields documents in a deterministic order and refuses
//! collections in which two entries share an identifier.

pub mod frontmatter;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use walkdir::WalkDir;

use docsets_shared::{ContentConfig, DocsetsError, Document, Result, normalize_id};

/// A read-only content collection.
pub trait DocumentSource: Send + Sync {
    /// Short human-readable name used in logs and errors.
    fn describe(&self) -> String;

    /// Read the full collection.
    fn list_documents(&self) -> Result<Vec<Document>>;
}

/// Fail with [`DocsetsError::DuplicateIdentifier`] on the first id that
/// repeats after normalization.
pub fn ensure_unique_ids(documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for doc in documents {
        let id = normalize_id(&doc.id);
        if !seen.insert(id) {
            return Err(DocsetsError::DuplicateIdentifier { id: id.to_string() });
        }
    }
    Ok(())
}

/// Whether a path component is skipped while walking a content root.
fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

// ---------------------------------------------------------------------------
// DirectorySource
// ---------------------------------------------------------------------------

/// Reads every matching file under a content root.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }

    /// Build from the `[content]` config section with an already-resolved root.
    pub fn from_config(root: impl Into<PathBuf>, config: &ContentConfig) -> Self {
        Self::new(root, config.extensions.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    fn read_document(&self, path: &Path) -> Result<Document> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DocsetsError::source_unavailable(self.describe(), format!("{}: {e}", path.display()))
        })?;

        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let (data, body) = frontmatter::split(&content).map_err(|e| match e {
            DocsetsError::Parse { message } => {
                DocsetsError::parse(format!("{}: {message}", rel.display()))
            }
            other => other,
        })?;
        let id = frontmatter::resolve_id(rel, &data);

        Ok(Document::new(id, data, body))
    }
}

impl DocumentSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn list_documents(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(DocsetsError::source_unavailable(
                self.describe(),
                "content directory does not exist",
            ));
        }

        let mut documents = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_str().is_some_and(is_hidden));

        for entry in walker {
            let entry = entry
                .map_err(|e| DocsetsError::source_unavailable(self.describe(), e.to_string()))?;

            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                continue;
            }

            let doc = self.read_document(entry.path())?;
            debug!(id = %doc.id, path = %entry.path().display(), "read document");
            documents.push(doc);
        }

        ensure_unique_ids(&documents)?;
        debug!(count = documents.len(), "content collection loaded");

        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// JsonSnapshotSource
// ---------------------------------------------------------------------------

/// Reads a `docs.json` produced by the export serializer.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for JsonSnapshotSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn list_documents(&self) -> Result<Vec<Document>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| DocsetsError::source_unavailable(self.describe(), e.to_string()))?;

        let documents: Vec<Document> = serde_json::from_str(&content).map_err(|e| {
            DocsetsError::parse(format!("invalid snapshot {}: {e}", self.path.display()))
        })?;

        ensure_unique_ids(&documents)?;
        debug!(count = documents.len(), "snapshot loaded");
        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// An in-memory collection, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<Document>,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

impl DocumentSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} documents)", self.documents.len())
    }

    fn list_documents(&self) -> Result<Vec<Document>> {
        ensure_unique_ids(&self.documents)?;
        Ok(self
            .documents
            .iter()
            .map(|doc| Document {
                id: normalize_id(&doc.id).to_string(),
                ..doc.clone()
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docsets_shared::Metadata;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "docsets-content-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/content")
    }

    fn md_source(root: &Path) -> DirectorySource {
        DirectorySource::new(root, vec!["md".into(), "mdx".into()])
    }

    #[test]
    fn directory_source_reads_sorted_documents() {
        let tmp = temp_dir();
        write(&tmp, "index.md", "---\ntitle: Home\n---\nWelcome\n");
        write(&tmp, "guides/b.md", "---\ntitle: B\n---\nBee\n");
        write(&tmp, "guides/a.mdx", "---\ntitle: A\n---\nAy\n");
        write(&tmp, "notes.txt", "ignored");
        write(&tmp, "_partial.md", "ignored");

        let docs = md_source(&tmp).list_documents().unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["guides/a", "guides/b", "index"]);
        assert_eq!(docs[2].title(), Some("Home"));
        assert_eq!(docs[2].body, "Welcome\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_source_skips_hidden_and_underscore_directories() {
        let tmp = temp_dir();
        write(&tmp, "guides/a.md", "A\n");
        write(&tmp, ".obsidian/x.md", "ignored\n");
        write(&tmp, "_drafts/y.md", "ignored\n");
        write(&tmp, "guides/_wip/z.md", "ignored\n");

        let docs = md_source(&tmp).list_documents().unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["guides/a"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_source_missing_root_is_unavailable() {
        let missing = std::env::temp_dir().join("docsets-definitely-missing-dir-5521");
        let err = md_source(&missing).list_documents().unwrap_err();
        assert!(matches!(err, DocsetsError::SourceUnavailable { .. }));
    }

    #[test]
    fn directory_source_rejects_duplicate_ids() {
        let tmp = temp_dir();
        write(&tmp, "guides/x.md", "X\n");
        write(&tmp, "guides/x/index.md", "Also X\n");

        let err = md_source(&tmp).list_documents().unwrap_err();
        match err {
            DocsetsError::DuplicateIdentifier { id } => assert_eq!(id, "guides/x"),
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_source_reports_bad_frontmatter_with_path() {
        let tmp = temp_dir();
        write(&tmp, "broken.md", "---\ntitle: [oops\n---\n");

        let err = md_source(&tmp).list_documents().unwrap_err();
        assert!(err.to_string().contains("broken.md"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_source_reads_fixture_collection() {
        let docs = md_source(&fixture_dir()).list_documents().unwrap();
        assert!(docs.iter().any(|d| d.id == "index"));
        assert!(docs.iter().any(|d| d.id == "languages/node"));
        assert!(docs.iter().any(|d| d.id == "guides/adding-steps"));
    }

    #[test]
    fn json_snapshot_source_roundtrips() {
        let tmp = temp_dir();
        let docs = vec![
            Document::new(
                "guides/x",
                Metadata::new().with("title", "X").unwrap(),
                "...",
            ),
            Document::new("config/y", Metadata::new(), "..."),
        ];
        let path = tmp.join("docs.json");
        std::fs::write(&path, serde_json::to_string_pretty(&docs).unwrap()).unwrap();

        let loaded = JsonSnapshotSource::new(&path).list_documents().unwrap();
        assert_eq!(loaded, docs);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn json_snapshot_source_normalizes_and_rejects_equivalent_ids() {
        let tmp = temp_dir();
        let path = tmp.join("docs.json");

        std::fs::write(&path, r#"[{"id":"/guides/x/","data":{},"body":""}]"#).unwrap();
        let loaded = JsonSnapshotSource::new(&path).list_documents().unwrap();
        assert_eq!(loaded[0].id, "guides/x");

        std::fs::write(
            &path,
            r#"[{"id":"/guides/x/","data":{},"body":""},{"id":"guides/x","data":{},"body":""}]"#,
        )
        .unwrap();
        let err = JsonSnapshotSource::new(&path).list_documents().unwrap_err();
        match err {
            DocsetsError::DuplicateIdentifier { id } => assert_eq!(id, "guides/x"),
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn json_snapshot_source_missing_file_is_unavailable() {
        let err = JsonSnapshotSource::new("/nonexistent/docs.json")
            .list_documents()
            .unwrap_err();
        assert!(matches!(err, DocsetsError::SourceUnavailable { .. }));
    }

    #[test]
    fn memory_source_rejects_duplicates() {
        let source = MemorySource::new(vec![
            Document::new("a", Metadata::new(), ""),
            Document::new("a", Metadata::new(), ""),
        ]);
        assert!(matches!(
            source.list_documents(),
            Err(DocsetsError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn memory_source_compares_normalized_ids() {
        let mut raw = Document::new("a", Metadata::new(), "");
        raw.id = "/guides/x/".into();

        let loaded = MemorySource::new(vec![raw.clone()]).list_documents().unwrap();
        assert_eq!(loaded[0].id, "guides/x");

        let source = MemorySource::new(vec![raw, Document::new("guides/x", Metadata::new(), "")]);
        assert!(matches!(
            source.list_documents(),
            Err(DocsetsError::DuplicateIdentifier { id }) if id == "guides/x"
        ));
    }
}
