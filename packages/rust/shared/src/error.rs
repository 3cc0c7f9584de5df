//! Error types for docsets.
//!
//! Library crates use [`DocsetsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docsets operations.
#[derive(Debug, thiserror::Error)]
pub enum DocsetsError {
    /// The content collection could not be read.
    #[error("content source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// Two entries in the content collection share an identifier.
    #[error("duplicate document identifier '{id}'")]
    DuplicateIdentifier { id: String },

    /// A document's metadata cannot be represented in the export format.
    #[error("cannot serialize document '{id}': {message}")]
    Serialization { id: String, message: String },

    /// A set label was referenced that no `[[llms.sets]]` entry declares.
    #[error("unknown set '{label}'")]
    UnknownSetReference { label: String },

    /// A navigation group contains itself, directly or transitively.
    #[error("navigation group '{label}' contains itself")]
    CyclicReference { label: String },

    /// A navigation link points at neither a known document nor an external URL.
    #[error("navigation link '{label}' points to unknown target '{target}'")]
    DanglingLink { label: String, target: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Frontmatter or manifest parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (duplicate labels, malformed declarations, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsetsError>;

impl DocsetsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Report that the named content source cannot be read.
    pub fn source_unavailable(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: msg.into(),
        }
    }

    /// Whether this error comes from static configuration rather than request data.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSetReference { .. }
                | Self::CyclicReference { .. }
                | Self::DanglingLink { .. }
                | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocsetsError::config("missing content dir");
        assert_eq!(err.to_string(), "config error: missing content dir");

        let err = DocsetsError::DuplicateIdentifier {
            id: "guides/x".into(),
        };
        assert_eq!(err.to_string(), "duplicate document identifier 'guides/x'");

        let err = DocsetsError::DanglingLink {
            label: "Node".into(),
            target: "/languages/nod".into(),
        };
        assert!(err.to_string().contains("/languages/nod"));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(
            DocsetsError::UnknownSetReference {
                label: "Guides".into()
            }
            .is_configuration_error()
        );
        assert!(!DocsetsError::source_unavailable("content", "gone").is_configuration_error());
    }
}
