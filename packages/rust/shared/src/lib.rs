//! Shared types, error model, and configuration for docsets.
//!
//! This crate is the foundation depended on by all other docsets crates.
//! It provides:
//! - [`DocsetsError`]: the unified error type
//! - Domain types ([`Document`], [`Metadata`], [`MetaValue`])
//! - Configuration ([`SiteConfig`], [`LlmsConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    CONFIG_FILE_NAME, ContentConfig, ExportConfig, ExternalLink, LlmsConfig, NavDeclaration,
    NavGroupDeclaration, ServerConfig, SetDeclaration, SiteConfig, SiteMeta, init_config,
    load_config, load_config_from, resolve_content_dir,
};
pub use error::{DocsetsError, Result};
pub use types::{Document, MetaValue, Metadata, normalize_id, title_from_id};
