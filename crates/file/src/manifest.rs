//! Upload manifests mapping paths to content references.

use bzzup_primitives::ChunkAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One file of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub reference: ChunkAddress,
    pub content_type: String,
    pub filename: String,
    pub size: u64,
}

/// Path-keyed manifest, serialised deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_document: Option<String>,
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry at `path`.
    pub fn insert(&mut self, path: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the manifest as JSON.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
