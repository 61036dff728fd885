use crate::bucket::{Bucket, BucketEntry};
use crate::error::{IndexError, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use svdb_protocol::vector::{dot, normalized, rank_top_k};
use svdb_protocol::{
    unix_timestamp, EventSink, IndexAction, IndexUpdateEvent, ScoredItem,
    DEFAULT_POINTER_DIMENSION,
};

/// Bucket id of a pointer: the first four bytes of `SHA-256` over its
/// little-endian `f32` bytes, read big-endian.
#[must_use]
pub fn bucket_id_for(pointer: &[f32]) -> u32 {
    let mut hasher = Sha256::new();
    for value in pointer {
        hasher.update(value.to_le_bytes());
    }
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Membership {
    bucket_id: u32,
    chunk: usize,
}

#[derive(Debug, Default)]
struct IndexState {
    buckets: BTreeMap<u32, Bucket>,
    item_buckets: HashMap<String, Vec<Membership>>,
    last_update: f64,
}

impl IndexState {
    /// Drops every membership of `item_id`; returns the touched bucket ids.
    fn remove_item(&mut self, item_id: &str) -> Option<Vec<u32>> {
        let memberships = self.item_buckets.remove(item_id)?;
        let mut touched = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let now_empty = match self.buckets.get_mut(&membership.bucket_id) {
                Some(bucket) => {
                    bucket.remove(item_id, membership.chunk);
                    bucket.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.buckets.remove(&membership.bucket_id);
            }
            touched.push(membership.bucket_id);
        }
        Some(touched)
    }

    /// Places every pointer of `item_id` and refreshes the touched centroids.
    ///
    /// Returns the bucket id of each chunk, in chunk order. Pointers must
    /// already be validated against `dimension`.
    fn insert_item(&mut self, item_id: &str, pointers: &[Vec<f32>], dimension: usize) -> Result<Vec<u32>> {
        let mut touched = BTreeSet::new();
        let mut memberships = Vec::with_capacity(pointers.len());
        for (chunk, pointer) in pointers.iter().enumerate() {
            let bucket_id = bucket_id_for(pointer);
            let bucket = self
                .buckets
                .entry(bucket_id)
                .or_insert_with(|| Bucket::new(bucket_id, dimension));
            bucket.insert_deferred(BucketEntry {
                item_id: item_id.to_string(),
                chunk,
                pointer: pointer.clone(),
            })?;
            touched.insert(bucket_id);
            memberships.push(Membership { bucket_id, chunk });
        }
        for bucket_id in &touched {
            if let Some(bucket) = self.buckets.get_mut(bucket_id) {
                bucket.refresh();
            }
        }
        let placed = memberships.iter().map(|m| m.bucket_id).collect();
        self.item_buckets.insert(item_id.to_string(), memberships);
        Ok(placed)
    }
}

/// In-memory pointer index partitioned into content-hash buckets.
///
/// One writer at a time; readers share the lock and never see a bucket
/// between a membership change and its centroid refresh.
pub struct BucketIndex {
    dimension: usize,
    state: RwLock<IndexState>,
    events: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for BucketIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketIndex")
            .field("dimension", &self.dimension)
            .field("buckets", &self.bucket_count())
            .field("items", &self.indexed_item_count())
            .finish()
    }
}

impl Default for BucketIndex {
    fn default() -> Self {
        Self::new(DEFAULT_POINTER_DIMENSION)
    }
}

impl BucketIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(IndexState {
                last_update: unix_timestamp(),
                ..IndexState::default()
            }),
            events: None,
        }
    }

    /// Emits one [`IndexUpdateEvent`] per bucket membership change.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Indexes `pointers` for `item_id`, replacing any previous entries.
    ///
    /// Every pointer is validated before anything is touched, so a rejected
    /// call leaves the index unchanged.
    pub fn add(&self, item_id: &str, pointers: &[Vec<f32>]) -> Result<()> {
        self.validate(item_id, pointers)?;

        let mut events = Vec::new();
        {
            let mut state = self.write();
            let now = unix_timestamp();
            let replaced = state.remove_item(item_id);
            let action = if let Some(old_buckets) = &replaced {
                events.extend(
                    old_buckets
                        .iter()
                        .map(|bucket_id| update_event(item_id, IndexAction::Remove, *bucket_id, now)),
                );
                IndexAction::Update
            } else {
                IndexAction::Add
            };

            let placed = state.insert_item(item_id, pointers, self.dimension)?;
            events.extend(
                placed
                    .into_iter()
                    .map(|bucket_id| update_event(item_id, action, bucket_id, now)),
            );
            state.last_update = now;
        }

        log::debug!("Indexed {} pointers for item {item_id}", pointers.len());
        self.emit(&events);
        Ok(())
    }

    /// Swaps in a fresh index built from `items`, under a single write lock.
    ///
    /// The new state is assembled off to the side, so readers see either the
    /// old index or the complete new one. Any invalid item rejects the whole
    /// call and leaves the current index in place. No update events are
    /// emitted.
    pub fn replace_all<I, S>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, Vec<Vec<f32>>)>,
        S: AsRef<str>,
    {
        let mut next = IndexState::default();
        for (item_id, pointers) in items {
            let item_id = item_id.as_ref();
            self.validate(item_id, &pointers)?;
            next.remove_item(item_id);
            next.insert_item(item_id, &pointers, self.dimension)?;
        }
        next.last_update = unix_timestamp();
        let count = next.item_buckets.len();

        *self.write() = next;
        log::debug!("Replaced bucket index with {count} items");
        Ok(count)
    }

    fn validate(&self, item_id: &str, pointers: &[Vec<f32>]) -> Result<()> {
        if pointers.is_empty() {
            return Err(IndexError::NoPointers(item_id.to_string()));
        }
        if let Some(bad) = pointers.iter().find(|p| p.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(())
    }

    /// Removes every pointer of `item_id`; `false` if it was never indexed.
    pub fn remove(&self, item_id: &str) -> bool {
        let removed = {
            let mut state = self.write();
            let removed = state.remove_item(item_id);
            if removed.is_some() {
                state.last_update = unix_timestamp();
            }
            removed
        };

        let Some(buckets) = removed else {
            return false;
        };
        let now = unix_timestamp();
        let events: Vec<IndexUpdateEvent> = buckets
            .into_iter()
            .map(|bucket_id| update_event(item_id, IndexAction::Remove, bucket_id, now))
            .collect();
        log::debug!("Removed item {item_id} from {} buckets", events.len());
        self.emit(&events);
        true
    }

    /// Ranks buckets by centroid similarity, scans the best `max_buckets`, and
    /// returns the top `top_k` items by their best chunk score.
    pub fn search(
        &self,
        query_pointer: &[f32],
        top_k: usize,
        max_buckets: usize,
    ) -> Result<Vec<ScoredItem>> {
        if query_pointer.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_pointer.len(),
            });
        }
        let unit_query = normalized(query_pointer);

        let state = self.read();
        if state.buckets.is_empty() {
            return Ok(Vec::new());
        }

        let mut bucket_scores: Vec<(u32, f32)> = state
            .buckets
            .iter()
            .filter_map(|(id, bucket)| bucket.centroid().map(|c| (*id, dot(&unit_query, c))))
            .collect();
        bucket_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        bucket_scores.truncate(max_buckets);

        let mut merged: Vec<ScoredItem> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (bucket_id, _) in &bucket_scores {
            let Some(bucket) = state.buckets.get(bucket_id) else {
                continue;
            };
            for (entry, score) in bucket.score_members(&unit_query) {
                match positions.get(entry.item_id.as_str()) {
                    Some(&pos) => {
                        if score > merged[pos].score {
                            merged[pos].score = score;
                        }
                    }
                    None => {
                        positions.insert(entry.item_id.as_str(), merged.len());
                        merged.push(ScoredItem::new(entry.item_id.clone(), score));
                    }
                }
            }
        }

        log::debug!(
            "Bucket search scanned {} buckets, {} candidate items",
            bucket_scores.len(),
            merged.len()
        );
        Ok(rank_top_k(merged, top_k))
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.read().buckets.len()
    }

    #[must_use]
    pub fn indexed_item_count(&self) -> usize {
        self.read().item_buckets.len()
    }

    #[must_use]
    pub fn contains(&self, item_id: &str) -> bool {
        self.read().item_buckets.contains_key(item_id)
    }

    #[must_use]
    pub fn last_update(&self) -> f64 {
        self.read().last_update
    }

    /// `(bucket_id, sub_item_id)` pairs registered for `item_id`.
    #[must_use]
    pub fn buckets_for(&self, item_id: &str) -> Option<Vec<(u32, String)>> {
        self.read().item_buckets.get(item_id).map(|memberships| {
            memberships
                .iter()
                .map(|m| (m.bucket_id, format!("{item_id}_{}", m.chunk)))
                .collect()
        })
    }

    #[must_use]
    pub fn bucket_ids(&self) -> Vec<u32> {
        self.read().buckets.keys().copied().collect()
    }

    /// Copy of one bucket as currently visible to readers.
    #[must_use]
    pub fn bucket(&self, bucket_id: u32) -> Option<Bucket> {
        self.read().buckets.get(&bucket_id).cloned()
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.buckets.clear();
        state.item_buckets.clear();
        state.last_update = unix_timestamp();
    }

    fn emit(&self, events: &[IndexUpdateEvent]) {
        if let Some(sink) = &self.events {
            for event in events {
                sink.record_index_update(event);
            }
        }
    }
}

fn update_event(item_id: &str, action: IndexAction, bucket_id: u32, timestamp: f64) -> IndexUpdateEvent {
    IndexUpdateEvent {
        item_id: item_id.to_string(),
        action,
        bucket_id,
        timestamp,
    }
}
