//! Site orchestration: validated configuration plus the `build` pipeline.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use docsets_content::DocumentSource;
use docsets_shared::{Document, Result, SiteConfig};

use crate::assembler::{self, Artifact, ArtifactReport};
use crate::export::{self, ExportPolicy};
use crate::manifest::{self, LLMS_FULL_TXT, LLMS_SMALL_TXT, LLMS_TXT};
use crate::navigation::{self, NavigationTree};
use crate::organizer::{Manifest, SetOrganizer};

pub const EXPORT_FILE: &str = "docs.json";

/// A configuration whose set declarations have been compiled and checked.
///
/// Everything that can be validated without reading content is validated
/// in [`Site::new`]; navigation needs the collection and is checked by
/// [`Site::navigation`].
#[derive(Debug, Clone)]
pub struct Site {
    config: SiteConfig,
    organizer: SetOrganizer,
    policy: ExportPolicy,
}

impl Site {
    /// Compile the organizer and read the export secret from the environment.
    pub fn new(config: SiteConfig) -> Result<Self> {
        let policy = ExportPolicy::from_secret(config.export_secret()?);
        Self::with_policy(config, policy)
    }

    /// Like [`Site::new`] with an explicit export policy.
    pub fn with_policy(config: SiteConfig, policy: ExportPolicy) -> Result<Self> {
        let organizer = SetOrganizer::from_config(&config)?;
        Ok(Self {
            config,
            organizer,
            policy,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn organizer(&self) -> &SetOrganizer {
        &self.organizer
    }

    pub fn policy(&self) -> &ExportPolicy {
        &self.policy
    }

    pub fn manifest(&self, documents: &[Document]) -> Manifest {
        self.organizer.organize(documents)
    }

    /// Build and validate the sidebar against `documents`.
    pub fn navigation(&self, documents: &[Document]) -> Result<NavigationTree> {
        NavigationTree::from_declaration(
            &self.config.sidebar,
            &self.config.sidebar_groups,
            &navigation::known_ids(documents),
        )
    }

    pub fn render_llms_txt(&self, documents: &[Document]) -> String {
        manifest::render_llms_txt(&self.manifest(documents))
    }

    pub fn render_full(&self, documents: &[Document]) -> String {
        let ordered = self.organizer.order_documents(documents);
        manifest::render_full(self.organizer.project(), &ordered)
    }

    pub fn render_small(&self, documents: &[Document]) -> String {
        let ordered = self.organizer.order_documents(documents);
        manifest::render_small(self.organizer.project(), &ordered)
    }

    /// Render the set file for `slug`, or `None` for an undeclared slug.
    pub fn render_set(&self, documents: &[Document], slug: &str) -> Option<String> {
        let manifest = self.manifest(documents);
        let set = manifest.set_by_slug(slug)?;
        Some(manifest::render_set_file(&manifest.project, set, documents))
    }

    /// Render every build artifact from one snapshot of the collection.
    pub fn render_artifacts(&self, documents: &[Document]) -> Result<Vec<Artifact>> {
        let manifest = self.manifest(documents);

        let mut artifacts = vec![
            Artifact::new(EXPORT_FILE, export::serialize(documents)?),
            Artifact::new(LLMS_TXT, manifest::render_llms_txt(&manifest)),
            Artifact::new(LLMS_FULL_TXT, self.render_full(documents)),
            Artifact::new(LLMS_SMALL_TXT, self.render_small(documents)),
        ];
        artifacts.extend(manifest.sets.iter().map(|set| {
            Artifact::new(
                manifest::set_file_path(set),
                manifest::render_set_file(&manifest.project, set, documents),
            )
        }));

        Ok(artifacts)
    }
}

/// Outcome of [`build`].
#[derive(Debug)]
pub struct BuildResult {
    pub out_dir: PathBuf,
    pub document_count: usize,
    pub set_count: usize,
    pub report: ArtifactReport,
    pub elapsed: Duration,
}

/// Read the collection once, validate navigation, and write all artifacts.
///
/// Nothing is written when reading, validation or serialization fails.
#[instrument(skip_all, fields(source = %source.describe(), out_dir = %out_dir.display()))]
pub fn build(site: &Site, source: &dyn DocumentSource, out_dir: &Path) -> Result<BuildResult> {
    let start = Instant::now();

    let documents = source.list_documents()?;
    info!(documents = documents.len(), "content loaded");

    site.navigation(&documents)?;
    let artifacts = site.render_artifacts(&documents)?;
    let report = assembler::write_artifacts(out_dir, &artifacts)?;

    let result = BuildResult {
        out_dir: out_dir.to_path_buf(),
        document_count: documents.len(),
        set_count: site.config.llms.sets.len(),
        report,
        elapsed: start.elapsed(),
    };

    info!(
        documents = result.document_count,
        sets = result.set_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );

    Ok(result)
}
