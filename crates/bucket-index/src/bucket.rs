use crate::error::{IndexError, Result};
use svdb_protocol::unix_timestamp;
use svdb_protocol::vector::{dot, normalize, normalized};

/// One chunk's pointer inside a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEntry {
    pub item_id: String,
    pub chunk: usize,
    pub pointer: Vec<f32>,
}

impl BucketEntry {
    /// `"{item_id}_{chunk}"`.
    #[must_use]
    pub fn sub_item_id(&self) -> String {
        format!("{}_{}", self.item_id, self.chunk)
    }

    fn matches(&self, item_id: &str, chunk: usize) -> bool {
        self.chunk == chunk && self.item_id == item_id
    }
}

/// Pointers whose content hash collided on the same 32-bit bucket id.
///
/// The centroid is the renormalized mean of the member pointers and is
/// `None` exactly when the bucket is empty.
#[derive(Debug, Clone)]
pub struct Bucket {
    id: u32,
    dimension: usize,
    entries: Vec<BucketEntry>,
    centroid: Option<Vec<f32>>,
    last_update: f64,
}

impl Bucket {
    #[must_use]
    pub fn new(id: u32, dimension: usize) -> Self {
        Self {
            id,
            dimension,
            entries: Vec::new(),
            centroid: None,
            last_update: unix_timestamp(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Inserts (or replaces) a chunk pointer and refreshes the centroid.
    pub fn insert(&mut self, entry: BucketEntry) -> Result<()> {
        self.insert_deferred(entry)?;
        self.refresh();
        Ok(())
    }

    /// Insert without recomputing the centroid; callers must `refresh` before
    /// the bucket becomes visible to readers.
    pub(crate) fn insert_deferred(&mut self, entry: BucketEntry) -> Result<()> {
        if entry.pointer.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: entry.pointer.len(),
            });
        }
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.matches(&entry.item_id, entry.chunk))
        {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
        Ok(())
    }

    pub fn remove(&mut self, item_id: &str, chunk: usize) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.matches(item_id, chunk));
        let removed = self.entries.len() != before;
        if removed {
            self.refresh();
        }
        removed
    }

    pub(crate) fn refresh(&mut self) {
        self.centroid = compute_centroid(&self.entries, self.dimension);
        self.last_update = unix_timestamp();
    }

    #[must_use]
    pub fn contains(&self, sub_item_id: &str) -> bool {
        self.entries.iter().any(|e| e.sub_item_id() == sub_item_id)
    }

    #[must_use]
    pub fn pointer(&self, sub_item_id: &str) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|e| e.sub_item_id() == sub_item_id)
            .map(|e| e.pointer.as_slice())
    }

    #[must_use]
    pub fn entries(&self) -> &[BucketEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn centroid(&self) -> Option<&[f32]> {
        self.centroid.as_deref()
    }

    #[must_use]
    pub const fn last_update(&self) -> f64 {
        self.last_update
    }

    /// Cosine similarity of an already-normalized query to every member, in
    /// insertion order.
    pub(crate) fn score_members<'a>(
        &'a self,
        unit_query: &'a [f32],
    ) -> impl Iterator<Item = (&'a BucketEntry, f32)> + 'a {
        self.entries
            .iter()
            .map(move |entry| (entry, dot(unit_query, &normalized(&entry.pointer))))
    }

    /// Top `top_k` members by cosine similarity, as `(sub_item_id, score)`.
    #[must_use]
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<(String, f32)> {
        if self.entries.is_empty() || query.len() != self.dimension {
            return Vec::new();
        }
        let unit_query = normalized(query);
        let mut scored: Vec<(String, f32)> = self
            .score_members(&unit_query)
            .map(|(entry, score)| (entry.sub_item_id(), score))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

fn compute_centroid(entries: &[BucketEntry], dimension: usize) -> Option<Vec<f32>> {
    if entries.is_empty() {
        return None;
    }
    let mut centroid = vec![0.0f32; dimension];
    for entry in entries {
        for (acc, value) in centroid.iter_mut().zip(entry.pointer.iter()) {
            *acc += value;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let count = entries.len() as f32;
    for value in &mut centroid {
        *value /= count;
    }
    normalize(&mut centroid);
    Some(centroid)
}
