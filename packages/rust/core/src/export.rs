//! JSON export of the content collection and its access policy.

use tracing::{debug, instrument};

use docsets_content::DocumentSource;
use docsets_shared::{DocsetsError, Document, Result};

/// Serialize documents as a pretty-printed JSON array of `{id, data, body}`.
///
/// Source order is preserved. Output uses two-space indentation and ends
/// with a newline. Fails with [`DocsetsError::Serialization`] naming the
/// document and metadata key when a value has no JSON representation; no
/// bytes are produced in that case.
#[instrument(skip_all, fields(count = documents.len()))]
pub fn serialize(documents: &[Document]) -> Result<Vec<u8>> {
    for doc in documents {
        if let Some(key) = doc.data.find_unrepresentable() {
            return Err(DocsetsError::Serialization {
                id: doc.id.clone(),
                message: format!("metadata '{key}' is not a finite number"),
            });
        }
    }

    let mut bytes = serde_json::to_vec_pretty(documents).map_err(|e| {
        DocsetsError::Serialization {
            id: "<collection>".into(),
            message: e.to_string(),
        }
    })?;
    bytes.push(b'\n');

    debug!(bytes = bytes.len(), "serialized export");
    Ok(bytes)
}

/// Read `source` and serialize it in one pass.
pub fn export_source(source: &dyn DocumentSource) -> Result<Vec<u8>> {
    let documents = source.list_documents()?;
    serialize(&documents)
}

// ---------------------------------------------------------------------------
// Access policy
// ---------------------------------------------------------------------------

/// Gate in front of the export endpoint.
///
/// With no secret every request is allowed. With a secret, the request's
/// `Authorization` header must equal it exactly.
#[derive(Debug, Clone, Default)]
pub struct ExportPolicy {
    secret: Option<String>,
}

impl ExportPolicy {
    /// Open access.
    pub fn open() -> Self {
        Self { secret: None }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    pub fn from_secret(secret: Option<String>) -> Self {
        Self { secret }
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    /// Decide whether a request carrying `authorization` may read the export.
    pub fn allows(&self, authorization: Option<&str>) -> bool {
        match &self.secret {
            None => true,
            Some(secret) => authorization.is_some_and(|given| constant_time_eq(given, secret)),
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
