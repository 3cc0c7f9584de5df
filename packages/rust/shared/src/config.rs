//! Site configuration for docsets.
//!
//! Config lives in `docsets.toml` next to the documentation project.
//! CLI flags override config file values, which override defaults.
//! The loaded [`SiteConfig`] is immutable and passed explicitly into each
//! component; nothing reads configuration from global state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocsetsError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "docsets.toml";

// ---------------------------------------------------------------------------
// Config structs (matching docsets.toml schema)
// ---------------------------------------------------------------------------

/// Top-level site config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Project-wide metadata.
    #[serde(default)]
    pub site: SiteMeta,

    /// Where the content collection lives.
    #[serde(default)]
    pub content: ContentConfig,

    /// `llms.txt` manifest declarations.
    #[serde(default)]
    pub llms: LlmsConfig,

    /// Export endpoint access policy.
    #[serde(default)]
    pub export: ExportConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Sidebar navigation declaration, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sidebar: Vec<NavDeclaration>,

    /// Reusable navigation groups referenced by `{ group = "name" }`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidebar_groups: BTreeMap<String, NavGroupDeclaration>,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMeta {
    /// Site title, also the default manifest project name.
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Public base URL used when rendering absolute links in manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,

    /// Social links keyed by platform (e.g. `github`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub social: BTreeMap<String, String>,

    /// Base URL for "edit this page" links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_link_base: Option<String>,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: None,
            site_url: None,
            social: BTreeMap::new(),
            edit_link_base: None,
        }
    }
}

fn default_title() -> String {
    "Documentation".into()
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Content directory, relative to the config file.
    #[serde(default = "default_content_dir")]
    pub dir: String,

    /// File extensions treated as documents.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
            extensions: default_extensions(),
        }
    }
}

fn default_content_dir() -> String {
    "src/content/docs".into()
}
fn default_extensions() -> Vec<String> {
    vec!["md".into(), "mdx".into()]
}

/// `[llms]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmsConfig {
    /// Manifest title; falls back to `site.title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Manifest summary; falls back to `site.description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form notes rendered below the summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Identifier patterns surfaced first, in priority order.
    #[serde(default = "default_promote")]
    pub promote: Vec<String>,

    /// Identifier patterns pushed last, in order.
    #[serde(default)]
    pub demote: Vec<String>,

    /// Identifier patterns left out of `llms-full.txt` and `llms-small.txt`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Declared documentation sets, in manifest order.
    #[serde(default)]
    pub sets: Vec<SetDeclaration>,

    /// Promotion patterns scoped to a single set, keyed by set label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_promote: BTreeMap<String, Vec<String>>,

    /// External reference links for the `Optional` section.
    #[serde(default)]
    pub optional_links: Vec<ExternalLink>,
}

impl Default for LlmsConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            description: None,
            details: None,
            promote: default_promote(),
            demote: Vec::new(),
            exclude: Vec::new(),
            sets: Vec::new(),
            set_promote: BTreeMap::new(),
            optional_links: Vec::new(),
        }
    }
}

fn default_promote() -> Vec<String> {
    vec!["index*".into()]
}

/// `[[llms.sets]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDeclaration {
    /// Unique label, also the set's heading.
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Glob patterns selecting member identifiers.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// `[[llms.optional_links]]` entry, copied verbatim into the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Name of the env var holding the export secret (never store the secret itself).
    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    /// Refuse to start when no secret is available instead of serving openly.
    #[serde(default)]
    pub require_secret: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            require_secret: false,
        }
    }
}

fn default_secret_env() -> String {
    "EXPORT_ENDPOINT_PASSWORD".into()
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4321".into()
}

// ---------------------------------------------------------------------------
// Navigation declarations
// ---------------------------------------------------------------------------

/// One `[[sidebar]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavDeclaration {
    /// `{ label, link }`
    Link { label: String, link: String },
    /// `{ label, items = [...] }`
    Group {
        label: String,
        items: Vec<NavDeclaration>,
    },
    /// `{ group = "name" }`, resolved against `[sidebar_groups]`.
    Reference { group: String },
}

/// `[sidebar_groups.<name>]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavGroupDeclaration {
    pub label: String,
    #[serde(default)]
    pub items: Vec<NavDeclaration>,
}

// ---------------------------------------------------------------------------
// Resolved helpers
// ---------------------------------------------------------------------------

impl SiteConfig {
    /// Manifest project name (`llms.project_name`, else `site.title`).
    pub fn project_name(&self) -> &str {
        self.llms.project_name.as_deref().unwrap_or(&self.site.title)
    }

    /// Manifest summary (`llms.description`, else `site.description`).
    pub fn project_description(&self) -> Option<&str> {
        self.llms
            .description
            .as_deref()
            .or(self.site.description.as_deref())
    }

    /// Read the export secret from the configured env var.
    ///
    /// Returns `Ok(None)` when unset and not required (open access).
    pub fn export_secret(&self) -> Result<Option<String>> {
        let var_name = &self.export.secret_env;
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => Ok(Some(val)),
            _ if self.export.require_secret => Err(DocsetsError::config(format!(
                "export.require_secret is set but {var_name} is empty or unset"
            ))),
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the config from `path`. Returns defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<SiteConfig> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(SiteConfig::default());
    }

    load_config_from(path)
}

/// Load the config from a specific file path, failing if it is missing.
pub fn load_config_from(path: &Path) -> Result<SiteConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocsetsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocsetsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Resolve the content directory relative to the config file's directory.
pub fn resolve_content_dir(config_path: &Path, config: &SiteConfig) -> PathBuf {
    let dir = Path::new(&config.content.dir);
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    config_path
        .parent()
        .map(|parent| parent.join(dir))
        .unwrap_or_else(|| dir.to_path_buf())
}

/// Write a default config file at `path`. Refuses to overwrite.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(DocsetsError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DocsetsError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&SiteConfig::default())
        .map_err(|e| DocsetsError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| DocsetsError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}
