use serde::{Deserialize, Serialize};

/// One item's embeddings and the pointers derived from them, pairwise aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub item_id: String,
    pub embeddings: Vec<Vec<f32>>,
    pub pointers: Vec<Vec<f32>>,
    /// Seconds since the Unix epoch of the last write.
    pub timestamp: f64,
}

impl VectorRecord {
    #[must_use]
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

pub const VECTOR_STORE_SCHEMA_VERSION: u32 = 1;

/// On-disk form of the `vectors` table.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedStore {
    pub schema_version: u32,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub pointer_dimension: Option<usize>,
    pub last_update: f64,
    pub vectors: Vec<PersistedRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedRecord {
    pub id: String,
    /// Base64 of the binary vector blob.
    pub embeddings: String,
    pub pointers: String,
    pub timestamp: f64,
}
