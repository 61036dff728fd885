use crate::blob::{decode_base64, encode_base64, uniform_dimension};
use crate::error::{Result, VectorStoreError};
use crate::types::{PersistedRecord, PersistedStore, VectorRecord, VECTOR_STORE_SCHEMA_VERSION};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use svdb_protocol::vector::{cosine_similarity, rank_top_k};
use svdb_protocol::{unix_timestamp, ScoredItem};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<VectorRecord>,
    positions: HashMap<String, usize>,
    dimension: Option<usize>,
    pointer_dimension: Option<usize>,
    last_update: f64,
}

/// Values restored when a write fails to reach disk.
struct Checkpoint {
    dimension: Option<usize>,
    pointer_dimension: Option<usize>,
    last_update: f64,
}

impl StoreState {
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            dimension: self.dimension,
            pointer_dimension: self.pointer_dimension,
            last_update: self.last_update,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.dimension = checkpoint.dimension;
        self.pointer_dimension = checkpoint.pointer_dimension;
        self.last_update = checkpoint.last_update;
    }

    fn get(&self, item_id: &str) -> Option<&VectorRecord> {
        self.positions.get(item_id).map(|&pos| &self.records[pos])
    }

    /// Replaces in place (keeping insertion order) or appends.
    fn upsert(&mut self, record: VectorRecord) -> Option<VectorRecord> {
        if let Some(&pos) = self.positions.get(&record.item_id) {
            return Some(std::mem::replace(&mut self.records[pos], record));
        }
        self.positions.insert(record.item_id.clone(), self.records.len());
        self.records.push(record);
        None
    }

    fn undo_upsert(&mut self, item_id: &str, previous: Option<VectorRecord>) {
        match previous {
            Some(old) => {
                if let Some(&pos) = self.positions.get(item_id) {
                    self.records[pos] = old;
                }
            }
            None => {
                if let Some(pos) = self.positions.remove(item_id) {
                    self.records.remove(pos);
                    self.reindex_from(pos);
                }
            }
        }
    }

    fn remove(&mut self, item_id: &str) -> Option<(usize, VectorRecord)> {
        let pos = self.positions.remove(item_id)?;
        let record = self.records.remove(pos);
        self.reindex_from(pos);
        Some((pos, record))
    }

    fn reinsert(&mut self, pos: usize, record: VectorRecord) {
        self.records.insert(pos, record);
        self.reindex_from(pos);
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, record) in self.records.iter().enumerate().skip(start) {
            self.positions.insert(record.item_id.clone(), pos);
        }
    }

    fn validate(&self, embeddings: &[Vec<f32>], pointers: &[Vec<f32>]) -> Result<(Option<usize>, Option<usize>)> {
        if embeddings.len() != pointers.len() {
            return Err(VectorStoreError::LengthMismatch {
                embeddings: embeddings.len(),
                pointers: pointers.len(),
            });
        }
        let dimension = uniform_dimension(embeddings)?;
        check_fixed(self.dimension, dimension)?;
        let pointer_dimension = uniform_dimension(pointers)?;
        check_fixed(self.pointer_dimension, pointer_dimension)?;
        Ok((dimension, pointer_dimension))
    }

    fn to_persisted(&self) -> PersistedStore {
        PersistedStore {
            schema_version: VECTOR_STORE_SCHEMA_VERSION,
            dimension: self.dimension,
            pointer_dimension: self.pointer_dimension,
            last_update: self.last_update,
            vectors: self
                .records
                .iter()
                .map(|record| PersistedRecord {
                    id: record.item_id.clone(),
                    embeddings: encode_base64(&record.embeddings),
                    pointers: encode_base64(&record.pointers),
                    timestamp: record.timestamp,
                })
                .collect(),
        }
    }

    fn from_persisted(persisted: PersistedStore) -> Result<Self> {
        if persisted.schema_version != VECTOR_STORE_SCHEMA_VERSION {
            return Err(VectorStoreError::UnsupportedSchema {
                found: persisted.schema_version,
                expected: VECTOR_STORE_SCHEMA_VERSION,
            });
        }
        let mut state = Self {
            dimension: persisted.dimension,
            pointer_dimension: persisted.pointer_dimension,
            last_update: persisted.last_update,
            ..Self::default()
        };
        for row in persisted.vectors {
            let embeddings = decode_base64(&row.embeddings)?;
            let pointers = decode_base64(&row.pointers)?;
            let (dimension, pointer_dimension) = state.validate(&embeddings, &pointers)?;
            state.dimension = state.dimension.or(dimension);
            state.pointer_dimension = state.pointer_dimension.or(pointer_dimension);
            state.upsert(VectorRecord {
                item_id: row.id,
                embeddings,
                pointers,
                timestamp: row.timestamp,
            });
        }
        Ok(state)
    }
}

/// Best score per item, in iteration order; items without vectors are skipped.
fn best_scores<'a, F>(records: impl Iterator<Item = &'a VectorRecord>, score: F) -> Vec<ScoredItem>
where
    F: Fn(&VectorRecord, usize) -> f32,
{
    records
        .filter_map(|record| {
            (0..record.len())
                .map(|i| score(record, i))
                .reduce(f32::max)
                .map(|best| ScoredItem::new(record.item_id.clone(), best))
        })
        .collect()
}

fn check_fixed(fixed: Option<usize>, incoming: Option<usize>) -> Result<()> {
    match (fixed, incoming) {
        (Some(expected), Some(actual)) if expected != actual => {
            Err(VectorStoreError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Durable store of per-item embedding and pointer lists.
///
/// Every mutation is written to a JSON snapshot (temp file, `fsync`, rename)
/// before it returns. A write that fails to persist is undone in memory, so
/// readers never observe state that is not on disk.
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl VectorStore {
    /// Loads the snapshot at `path`, or starts empty if there is none.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let persisted: PersistedStore = serde_json::from_slice(&bytes)?;
                StoreState::from_persisted(persisted)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreState {
                last_update: unix_timestamp(),
                ..StoreState::default()
            },
            Err(err) => return Err(err.into()),
        };
        log::info!(
            "Opened VectorStore at {} ({} items)",
            path.display(),
            state.records.len()
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Discards any existing snapshot at `path` and writes an empty one.
    pub async fn open_fresh(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = StoreState {
            last_update: unix_timestamp(),
            ..StoreState::default()
        };
        write_atomic(&path, &serde_json::to_vec(&state.to_persisted())?).await?;
        log::info!("Created empty VectorStore at {}", path.display());
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upserts a record and returns its id (a fresh UUID when `item_id` is `None`).
    pub async fn store(
        &self,
        embeddings: Vec<Vec<f32>>,
        pointers: Vec<Vec<f32>>,
        item_id: Option<String>,
    ) -> Result<String> {
        let item_id = item_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut state = self.state.write().await;
        let (dimension, pointer_dimension) = state.validate(&embeddings, &pointers)?;
        let checkpoint = state.checkpoint();

        let now = unix_timestamp();
        state.dimension = state.dimension.or(dimension);
        state.pointer_dimension = state.pointer_dimension.or(pointer_dimension);
        state.last_update = now;
        let count = embeddings.len();
        let previous = state.upsert(VectorRecord {
            item_id: item_id.clone(),
            embeddings,
            pointers,
            timestamp: now,
        });
        let replaced = previous.is_some();

        if let Err(err) = self.persist(&state).await {
            log::warn!("Failed to persist item {item_id}, rolling back: {err}");
            state.undo_upsert(&item_id, previous);
            state.restore(checkpoint);
            return Err(err);
        }

        log::debug!(
            "{} item {item_id} with {count} vectors",
            if replaced { "Replaced" } else { "Stored" }
        );
        Ok(item_id)
    }

    pub async fn retrieve(&self, item_id: &str) -> Result<VectorRecord> {
        self.state
            .read()
            .await
            .get(item_id)
            .cloned()
            .ok_or_else(|| VectorStoreError::NotFound(item_id.to_string()))
    }

    pub async fn contains(&self, item_id: &str) -> bool {
        self.state.read().await.positions.contains_key(item_id)
    }

    pub async fn delete(&self, item_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let Some((pos, record)) = state.remove(item_id) else {
            return Err(VectorStoreError::NotFound(item_id.to_string()));
        };
        let checkpoint = state.checkpoint();
        state.last_update = unix_timestamp();

        if let Err(err) = self.persist(&state).await {
            log::warn!("Failed to persist deletion of {item_id}, rolling back: {err}");
            state.reinsert(pos, record);
            state.restore(checkpoint);
            return Err(err);
        }
        log::debug!("Deleted item {item_id}");
        Ok(())
    }

    /// Exhaustive cosine scan: each item scores its best embedding.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredItem>> {
        let scores = self.scores(query).await?;
        log::debug!("Exact scan over {} items (top_k: {top_k})", scores.len());
        Ok(rank_top_k(scores, top_k))
    }

    /// Blended score per pair:
    /// `(1 - w) * cos(query, embedding) + w * cos(query_pointer, pointer)`.
    pub async fn search_with_pointers(
        &self,
        query: &[f32],
        query_pointer: &[f32],
        top_k: usize,
        pointer_weight: f32,
    ) -> Result<Vec<ScoredItem>> {
        let weight = if (0.0..=1.0).contains(&pointer_weight) {
            pointer_weight
        } else {
            log::warn!("pointer_weight {pointer_weight} outside [0, 1]; clamping");
            pointer_weight.clamp(0.0, 1.0)
        };

        let state = self.state.read().await;
        check_fixed(state.dimension, Some(query.len()))?;
        check_fixed(state.pointer_dimension, Some(query_pointer.len()))?;
        let scores = best_scores(state.records.iter(), |record, i| {
            (1.0 - weight) * cosine_similarity(query, &record.embeddings[i])
                + weight * cosine_similarity(query_pointer, &record.pointers[i])
        });
        Ok(rank_top_k(scores, top_k))
    }

    /// Best cosine score of every item, unranked, in insertion order.
    pub async fn scores(&self, query: &[f32]) -> Result<Vec<ScoredItem>> {
        let state = self.state.read().await;
        check_fixed(state.dimension, Some(query.len()))?;
        Ok(best_scores(state.records.iter(), |record, i| {
            cosine_similarity(query, &record.embeddings[i])
        }))
    }

    /// Like [`Self::scores`] restricted to `item_ids`, still in insertion
    /// order. Unknown ids are skipped.
    pub async fn scores_for(&self, query: &[f32], item_ids: &[String]) -> Result<Vec<ScoredItem>> {
        let state = self.state.read().await;
        check_fixed(state.dimension, Some(query.len()))?;
        let mut positions: Vec<usize> = item_ids
            .iter()
            .filter_map(|id| state.positions.get(id).copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();
        let records = positions.into_iter().map(|pos| &state.records[pos]);
        Ok(best_scores(records, |record, i| {
            cosine_similarity(query, &record.embeddings[i])
        }))
    }

    /// Ids in insertion order.
    pub async fn all_ids(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .records
            .iter()
            .map(|record| record.item_id.clone())
            .collect()
    }

    /// Every record, in insertion order.
    pub async fn records(&self) -> Vec<VectorRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }

    /// Total embeddings across all items.
    pub async fn vector_count(&self) -> usize {
        self.state
            .read()
            .await
            .records
            .iter()
            .map(VectorRecord::len)
            .sum()
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.dimension
    }

    pub async fn last_update(&self) -> f64 {
        self.state.read().await.last_update
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let bytes = serde_json::to_vec(&state.to_persisted())?;
        write_atomic(&self.path, &bytes).await
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await?;
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("vectors"),
        std::process::id()
    ));

    if let Err(err) = replace_with_tmp(&tmp, path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    sync_dir(&parent).await?;
    Ok(())
}

async fn replace_with_tmp(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, path).await
}

/// Flushes the directory entry so the rename itself survives a crash.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
