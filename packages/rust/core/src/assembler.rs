//! Build output assembler.
//!
//! Writes rendered artifacts under an output directory and records their
//! checksums in `artifacts.json`.
//!
//! ```text
//! <out>/
//! ├── artifacts.json
//! ├── docs.json
//! ├── llms.txt
//! ├── llms-full.txt
//! ├── llms-small.txt
//! └── _llms-txt/
//!     └── <set-slug>.txt
//! ```

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use docsets_shared::{DocsetsError, Result};

use crate::manifest::SET_DIR;

pub const REPORT_FILE: &str = "artifacts.json";

/// A rendered file waiting to be written.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Path relative to the output directory, `/`-separated.
    pub path: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Checksum entry for one written artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Contents of `artifacts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub generated_at: String,
    pub artifacts: Vec<ArtifactMeta>,
}

/// Write every artifact atomically, prune stale output, then write the report.
///
/// Each file goes to a dot-prefixed temp sibling first and is renamed into
/// place, so readers never observe a partially written artifact. Files from
/// the previous report, and set files, that are not part of this build are
/// removed.
#[instrument(skip_all, fields(out_dir = %out_dir.display(), artifact_count = artifacts.len()))]
pub fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> Result<ArtifactReport> {
    std::fs::create_dir_all(out_dir).map_err(|e| DocsetsError::io(out_dir, e))?;

    let mut metas = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let target = resolve_artifact_path(out_dir, &artifact.path)?;
        write_atomic(&target, &artifact.content)?;

        let meta = ArtifactMeta {
            filename: artifact.path.clone(),
            sha256: sha256_hex(&artifact.content),
            size_bytes: artifact.content.len(),
        };
        debug!(filename = %meta.filename, size = meta.size_bytes, "wrote artifact");
        metas.push(meta);
    }

    remove_stale(out_dir, artifacts)?;

    let report = ArtifactReport {
        generated_at: Utc::now().to_rfc3339(),
        artifacts: metas,
    };

    let mut json = serde_json::to_vec_pretty(&report)
        .map_err(|e| DocsetsError::validation(format!("failed to serialize report: {e}")))?;
    json.push(b'\n');
    write_atomic(&out_dir.join(REPORT_FILE), &json)?;

    info!(
        artifact_count = report.artifacts.len(),
        path = %out_dir.display(),
        "build output written"
    );

    Ok(report)
}

/// Delete output left over from an earlier build that this one no longer produces.
fn remove_stale(out_dir: &Path, artifacts: &[Artifact]) -> Result<()> {
    let current: HashSet<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();

    let mut candidates: Vec<String> = std::fs::read_to_string(out_dir.join(REPORT_FILE))
        .ok()
        .and_then(|json| serde_json::from_str::<ArtifactReport>(&json).ok())
        .map(|report| report.artifacts.into_iter().map(|a| a.filename).collect())
        .unwrap_or_default();

    let set_dir = out_dir.join(SET_DIR);
    match std::fs::read_dir(&set_dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = entry.map_err(|e| DocsetsError::io(&set_dir, e))?;
                if entry.file_type().is_ok_and(|t| t.is_file()) {
                    if let Some(name) = entry.file_name().to_str() {
                        candidates.push(format!("{SET_DIR}/{name}"));
                    }
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(DocsetsError::io(&set_dir, e)),
    }

    for rel in candidates {
        if current.contains(rel.as_str()) {
            continue;
        }
        let Ok(path) = resolve_artifact_path(out_dir, &rel) else {
            continue;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(filename = %rel, "removed stale artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DocsetsError::io(&path, e)),
        }
    }

    Ok(())
}

/// Hex-encoded SHA-256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let dir = target.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| DocsetsError::io(dir, e))?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| DocsetsError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| DocsetsError::io(target, e))?;
    Ok(())
}

/// Join a relative artifact path onto the output directory, refusing
/// anything that would escape it.
fn resolve_artifact_path(out_dir: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    let escapes = rel.is_empty()
        || rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(DocsetsError::validation(format!(
            "artifact path '{rel}' must be relative and stay inside the output directory"
        )));
    }
    Ok(out_dir.join(rel_path))
}
