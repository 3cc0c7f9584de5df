//! llms.txt rendering and parsing.
//!
//! Renders the organized [`Manifest`] as `llms.txt`, the per-set
//! `_llms-txt/<slug>.txt` files, and the whole-collection `llms-full.txt` /
//! `llms-small.txt`. The parser reads an existing llms.txt back so that
//! `docsets check --llms` can flag links to documents that no longer exist.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use docsets_shared::{DocsetsError, Document, Result};

use crate::minify::minify_body;
use crate::navigation::normalize_target;
use crate::organizer::{Manifest, ManifestSet, ProjectMeta};

pub const LLMS_TXT: &str = "llms.txt";
pub const LLMS_FULL_TXT: &str = "llms-full.txt";
pub const LLMS_SMALL_TXT: &str = "llms-small.txt";
pub const SET_DIR: &str = "_llms-txt";

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the `llms.txt` index.
pub fn render_llms_txt(manifest: &Manifest) -> String {
    let project = &manifest.project;
    let base = project.base_url.as_str();
    let name = project.name.as_str();
    let mut blocks = vec![format!("# {name}")];

    if let Some(description) = non_empty(project.description.as_deref()) {
        blocks.push(format!("> {description}"));
    }
    if let Some(details) = non_empty(project.details.as_deref()) {
        blocks.push(details.to_string());
    }

    let mut index = String::from("## Documentation Sets\n\n");
    let _ = writeln!(
        index,
        "- [Abridged documentation]({base}/{LLMS_SMALL_TXT}): a compact version of the documentation for {name}, with non-essential content removed"
    );
    let _ = writeln!(
        index,
        "- [Complete documentation]({base}/{LLMS_FULL_TXT}): the full documentation for {name}"
    );
    for set in &manifest.sets {
        push_link(
            &mut index,
            &set.label,
            &format!("{base}/{}", set_file_path(set)),
            Some(set.description.as_str()),
        );
    }
    blocks.push(index);

    for set in &manifest.sets {
        let mut block = format!("## {}\n\n", set.label);
        if let Some(description) = non_empty(Some(set.description.as_str())) {
            let _ = writeln!(block, "{description}\n");
        }
        for member in &set.members {
            push_link(
                &mut block,
                &member.title,
                &document_url(base, &member.id),
                member.description.as_deref(),
            );
        }
        blocks.push(block);
    }

    if !manifest.links.is_empty() {
        let mut block = String::from("## Optional\n\n");
        for link in &manifest.links {
            push_link(&mut block, &link.label, &link.url, Some(link.description.as_str()));
        }
        blocks.push(block);
    }

    let mut out = blocks
        .iter()
        .map(|b| b.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

/// Render one `_llms-txt/<slug>.txt` file.
///
/// `documents` is the collection the manifest was organized from; members
/// missing from it are skipped.
pub fn render_set_file(project: &ProjectMeta, set: &ManifestSet, documents: &[Document]) -> String {
    let by_id: HashMap<&str, &Document> = documents.iter().map(|d| (d.id.as_str(), d)).collect();
    let members: Vec<&Document> = set
        .members
        .iter()
        .filter_map(|m| by_id.get(m.id.as_str()).copied())
        .collect();

    let header = format!(
        "This is the developer documentation for {} in {}.",
        set.label, project.name
    );
    render_documents(&header, &members, |body| body.trim().to_string())
}

/// Render `llms-full.txt` over already-ordered documents.
pub fn render_full(project: &ProjectMeta, documents: &[&Document]) -> String {
    let header = format!("This is the full developer documentation for {}.", project.name);
    render_documents(&header, documents, |body| body.trim().to_string())
}

/// Render `llms-small.txt`: like [`render_full`] with minified bodies.
pub fn render_small(project: &ProjectMeta, documents: &[&Document]) -> String {
    let header = format!(
        "This is the abridged developer documentation for {}.",
        project.name
    );
    render_documents(&header, documents, minify_body)
}

/// Relative path of a set's file inside the output directory.
pub fn set_file_path(set: &ManifestSet) -> String {
    format!("{SET_DIR}/{}.txt", set.slug)
}

/// Public URL of a document page.
pub fn document_url(base: &str, id: &str) -> String {
    if id == "index" {
        format!("{base}/")
    } else {
        format!("{base}/{id}/")
    }
}

fn render_documents(
    header: &str,
    documents: &[&Document],
    body: impl Fn(&str) -> String,
) -> String {
    let mut out = format!("<SYSTEM>{header}</SYSTEM>\n");

    for doc in documents {
        let _ = write!(out, "\n# {}\n", doc.display_title());
        if let Some(description) = non_empty(doc.description()) {
            let _ = write!(out, "\n> {description}\n");
        }
        let body = body(&doc.body);
        if !body.is_empty() {
            let _ = write!(out, "\n{body}\n");
        }
    }

    debug!(documents = documents.len(), bytes = out.len(), "rendered document bundle");
    out
}

fn push_link(out: &mut String, label: &str, url: &str, description: Option<&str>) {
    match non_empty(description) {
        Some(description) => {
            let _ = writeln!(out, "- [{label}]({url}): {description}");
        }
        None => {
            let _ = writeln!(out, "- [{label}]({url})");
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parsed llms.txt.
#[derive(Debug, Clone, Serialize)]
pub struct LlmsParsed {
    pub title: String,
    pub summary: Option<String>,
    pub sections: Vec<LlmsSection>,
}

/// A `## heading` and the links listed under it.
#[derive(Debug, Clone, Serialize)]
pub struct LlmsSection {
    pub title: String,
    pub entries: Vec<LlmsEntry>,
}

/// One `- [name](url): notes` line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmsEntry {
    pub name: String,
    pub url: String,
    pub notes: Option<String>,
}

impl LlmsParsed {
    pub fn entries(&self) -> impl Iterator<Item = (&LlmsSection, &LlmsEntry)> {
        self.sections
            .iter()
            .flat_map(|s| s.entries.iter().map(move |e| (s, e)))
    }
}

static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("H1 regex"));

static H2_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^##\s+(.+)$").expect("H2 regex"));

static BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s*(.+)$").expect("blockquote regex"));

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-*]\s+\[([^\]]+)\]\(([^)]+)\)(?::\s*(.+))?$").expect("link regex")
});

/// Parse llms.txt content.
///
/// The first non-blank line must be an H1. Descriptive text between links
/// is ignored.
pub fn parse_llms_txt(content: &str) -> Result<LlmsParsed> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

    let title = match lines.next() {
        Some(line) => match H1_RE.captures(line) {
            Some(caps) => caps[1].trim().to_string(),
            None => {
                return Err(DocsetsError::parse(
                    "llms.txt must start with an H1 heading (# Title)",
                ));
            }
        },
        None => return Err(DocsetsError::parse("llms.txt is empty")),
    };

    let mut summary_parts = Vec::new();
    while let Some(caps) = lines.peek().and_then(|l| BLOCKQUOTE_RE.captures(l)) {
        summary_parts.push(caps[1].trim().to_string());
        lines.next();
    }
    let summary = (!summary_parts.is_empty()).then(|| summary_parts.join(" "));

    let mut sections: Vec<LlmsSection> = Vec::new();
    for line in lines {
        if let Some(caps) = H2_RE.captures(line) {
            sections.push(LlmsSection {
                title: caps[1].trim().to_string(),
                entries: Vec::new(),
            });
        } else if let Some(caps) = LINK_RE.captures(line) {
            if let Some(section) = sections.last_mut() {
                section.entries.push(LlmsEntry {
                    name: caps[1].trim().to_string(),
                    url: caps[2].trim().to_string(),
                    notes: caps.get(3).map(|m| m.as_str().trim().to_string()),
                });
            }
        }
    }

    Ok(LlmsParsed {
        title,
        summary,
        sections,
    })
}

/// A link in an llms.txt that points at a page the collection does not have.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedEntry {
    pub section: String,
    pub name: String,
    pub url: String,
}

/// Report links under `base_url` (or root-relative ones) that do not resolve
/// to a known document. Links to the generated text files and to other
/// hosts are not checked.
pub fn unresolved_entries(
    parsed: &LlmsParsed,
    base_url: &str,
    known_ids: &HashSet<&str>,
) -> Vec<UnresolvedEntry> {
    let base = base_url.trim_end_matches('/');

    parsed
        .entries()
        .filter_map(|(section, entry)| {
            let path = local_path(&entry.url, base)?;
            let path = path.trim_start_matches('/');
            if path.ends_with(".txt") {
                return None;
            }
            let id = normalize_target(path);
            (!known_ids.contains(id)).then(|| UnresolvedEntry {
                section: section.title.clone(),
                name: entry.name.clone(),
                url: entry.url.clone(),
            })
        })
        .collect()
}

fn local_path<'a>(url: &'a str, base: &str) -> Option<&'a str> {
    if !base.is_empty() {
        if let Some(rest) = url.strip_prefix(base) {
            return (rest.is_empty() || rest.starts_with('/')).then_some(rest);
        }
    }
    url.starts_with('/').then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizer::SetOrganizer;
    use docsets_shared::{ExternalLink, LlmsConfig, Metadata, SetDeclaration};

    fn doc(id: &str, title: &str, description: Option<&str>, body: &str) -> Document {
        let mut data = Metadata::new().with("title", title).unwrap();
        if let Some(description) = description {
            data.insert("description", description).unwrap();
        }
        Document::new(id, data, body)
    }

    fn project() -> ProjectMeta {
        ProjectMeta {
            name: "Railpack".into(),
            description: Some("Zero-config builds".into()),
            details: Some("Successor to Nixpacks.".into()),
            base_url: "https://railpack.com".into(),
        }
    }

    fn docs() -> Vec<Document> {
        vec![
            doc("guides/x", "X", Some("About X"), "X body\n"),
            doc("config/y", "Y", None, "Y body\n"),
            doc("index", "Home", None, "Welcome <!-- hi -->\n"),
        ]
    }

    fn manifest() -> Manifest {
        let config = LlmsConfig {
            sets: vec![
                SetDeclaration {
                    label: "Guides".into(),
                    description: "How-to guides".into(),
                    paths: vec!["guides/**".into()],
                },
                SetDeclaration {
                    label: "Empty".into(),
                    description: String::new(),
                    paths: vec![],
                },
            ],
            optional_links: vec![ExternalLink {
                label: "GitHub".into(),
                url: "https://github.com/railwayapp/railpack".into(),
                description: "Source".into(),
            }],
            ..LlmsConfig::default()
        };
        SetOrganizer::new(project(), &config).unwrap().organize(&docs())
    }

    #[test]
    fn llms_txt_layout() {
        let text = render_llms_txt(&manifest());
        let expected = "\
# Railpack

> Zero-config builds

Successor to Nixpacks.

## Documentation Sets

- [Abridged documentation](https://railpack.com/llms-small.txt): a compact version of the documentation for Railpack, with non-essential content removed
- [Complete documentation](https://railpack.com/llms-full.txt): the full documentation for Railpack
- [Guides](https://railpack.com/_llms-txt/guides.txt): How-to guides
- [Empty](https://railpack.com/_llms-txt/empty.txt)

## Guides

How-to guides

- [X](https://railpack.com/guides/x/): About X

## Empty

## Optional

- [GitHub](https://github.com/railwayapp/railpack): Source
";
        assert_eq!(text, expected);
    }

    #[test]
    fn unclassified_documents_are_absent_from_manifest() {
        let text = render_llms_txt(&manifest());
        assert!(!text.contains("config/y"));
    }

    #[test]
    fn set_file_has_system_header_and_bodies() {
        let manifest = manifest();
        let set = manifest.set("Guides").unwrap();
        let text = render_set_file(&manifest.project, set, &docs());
        assert_eq!(
            text,
            "<SYSTEM>This is the developer documentation for Guides in Railpack.</SYSTEM>\n\n# X\n\n> About X\n\nX body\n"
        );
        assert_eq!(set_file_path(set), "_llms-txt/guides.txt");
    }

    #[test]
    fn small_output_minifies_bodies() {
        let docs = docs();
        let refs: Vec<&Document> = docs.iter().collect();
        let full = render_full(&project(), &refs);
        let small = render_small(&project(), &refs);
        assert!(full.contains("<!-- hi -->"));
        assert!(!small.contains("<!-- hi -->"));
        assert!(small.contains("# Home\n\nWelcome\n"));
    }

    #[test]
    fn document_url_for_index_is_root() {
        assert_eq!(document_url("https://x.dev", "index"), "https://x.dev/");
        assert_eq!(document_url("", "guides/x"), "/guides/x/");
    }

    #[test]
    fn parse_rendered_manifest() {
        let parsed = parse_llms_txt(&render_llms_txt(&manifest())).unwrap();
        assert_eq!(parsed.title, "Railpack");
        assert_eq!(parsed.summary.as_deref(), Some("Zero-config builds"));
        let titles: Vec<&str> = parsed.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Documentation Sets", "Guides", "Empty", "Optional"]);
        assert_eq!(
            parsed.sections[1].entries[0],
            LlmsEntry {
                name: "X".into(),
                url: "https://railpack.com/guides/x/".into(),
                notes: Some("About X".into()),
            }
        );
    }

    #[test]
    fn parse_requires_h1() {
        assert!(parse_llms_txt("").is_err());
        assert!(parse_llms_txt("## Not a title\n").is_err());
    }

    #[test]
    fn unresolved_entries_flags_missing_pages_only() {
        let content = "\
# Railpack

## Docs

- [X](https://railpack.com/guides/x/)
- [Gone](https://railpack.com/guides/gone/)
- [Home](/)
- [Relative gone](/config/zzz#anchor)
- [Full](https://railpack.com/llms-full.txt)
- [Elsewhere](https://github.com/railwayapp/railpack)
";
        let parsed = parse_llms_txt(content).unwrap();
        let docs = docs();
        let known = crate::navigation::known_ids(&docs);

        let unresolved = unresolved_entries(&parsed, "https://railpack.com/", &known);
        let names: Vec<&str> = unresolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Gone", "Relative gone"]);
        assert_eq!(unresolved[0].section, "Docs");
    }
}
