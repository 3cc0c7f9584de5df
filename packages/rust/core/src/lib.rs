//! Export, classification and manifest generation for docsets.
//!
//! This crate turns a content collection into its published forms:
//! - [`export`]: the `docs.json` serializer and its access policy
//! - [`glob`]: path patterns over document identifiers
//! - [`organizer`]: labeled documentation sets with promotion ordering
//! - [`navigation`]: the validated sidebar tree
//! - [`manifest`]: `llms.txt` family rendering and parsing
//! - [`assembler`] / [`pipeline`]: writing everything to disk

pub mod assembler;
pub mod export;
pub mod glob;
pub mod manifest;
pub mod minify;
pub mod navigation;
pub mod organizer;
pub mod pipeline;

pub use export::{ExportPolicy, export_source, serialize};
pub use glob::{GlobPattern, PatternSet};
pub use navigation::{NavigationBuilder, NavigationNode, NavigationTree, NodeId};
pub use organizer::{Manifest, ManifestEntry, ManifestSet, ProjectMeta, SetOrganizer};
pub use pipeline::{BuildResult, Site, build};
