//! YAML frontmatter splitting and identifier derivation.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use docsets_shared::{DocsetsError, Metadata, Result, normalize_id};

/// Matches a leading `---` fenced block. Group 1 is the YAML text (may be absent).
static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A\u{feff}?---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)")
        .expect("frontmatter regex")
});

/// Split raw file content into parsed frontmatter and the remaining body.
///
/// Content without a leading fence has empty metadata and is all body.
pub fn split(content: &str) -> Result<(Metadata, &str)> {
    let Some(caps) = FRONTMATTER_RE.captures(content) else {
        return Ok((Metadata::new(), content));
    };

    let body_start = caps.get(0).map_or(0, |m| m.end());
    let yaml = caps.get(1).map_or("", |m| m.as_str());

    if yaml.trim().is_empty() {
        return Ok((Metadata::new(), &content[body_start..]));
    }

    let metadata: Metadata = serde_yaml::from_str(yaml)
        .map_err(|e| DocsetsError::parse(format!("invalid frontmatter: {e}")))?;

    Ok((metadata, &content[body_start..]))
}

/// Derive a document identifier from a path relative to the content root.
///
/// `guides/Adding_Steps.md` becomes `guides/adding-steps`; `languages/index.md`
/// becomes `languages`; a root `index.md` stays `index`.
pub fn id_from_relative_path(rel: &Path) -> String {
    let mut segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        if let Some((stem, _ext)) = last.rsplit_once('.') {
            *last = stem.to_string();
        }
    }

    let slug = segments
        .iter()
        .map(|segment| slugify_segment(segment))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    match slug.strip_suffix("/index") {
        Some(parent) => parent.to_string(),
        None if slug.is_empty() => "index".to_string(),
        None => slug,
    }
}

/// Identifier for a parsed document: frontmatter `slug` wins over the path.
pub fn resolve_id(rel: &Path, metadata: &Metadata) -> String {
    match metadata.get_str("slug").map(normalize_id) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => id_from_relative_path(rel),
    }
}

/// Lowercase kebab-case, keeping only alphanumerics, `-` and `.`.
fn slugify_segment(segment: &str) -> String {
    segment
        .to_lowercase()
        .replace([' ', '_'], "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '.')
        .collect()
}
