use crate::embedder::{Embedder, StubEmbedder};
use crate::error::{EngineError, Result};
use crate::monitor::{PerformanceMonitor, PerformanceSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use svdb_bucket_index::{BucketIndex, IndexError};
use svdb_fingerprint::FingerprintHasher;
use svdb_protocol::{
    unix_timestamp, BackendCapability, EventSink, JsonlEventLog, OperationEvent,
    OperationStatus, ScoredItem, SvdbConfig,
};
use svdb_search::{AmplifiedSearch, BucketSearch, ExactSearch, Query, SearchStats, SearchStrategy};
use svdb_vector_store::{VectorRecord, VectorStore};
use tokio::sync::Mutex;

pub const VECTORS_FILE: &str = "vectors.json";
pub const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Exact,
    Amplified,
    Bucket,
    /// Blended embedding + pointer similarity.
    Pointers,
}

impl SearchMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Amplified => "amplified",
            Self::Bucket => "bucket",
            Self::Pointers => "pointers",
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "amplified" | "grover" => Ok(Self::Amplified),
            "bucket" => Ok(Self::Bucket),
            "pointers" | "pointer" => Ok(Self::Pointers),
            other => Err(format!("unknown search mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub items: usize,
    pub vectors: usize,
    pub buckets: usize,
    pub indexed_items: usize,
}

/// Embeds, fingerprints, stores and indexes content; answers searches.
///
/// The vector store is the only persistent state. The bucket index is rebuilt
/// from it on open and kept in step with every write.
pub struct Database {
    dir: PathBuf,
    config: SvdbConfig,
    capability: BackendCapability,
    hasher: FingerprintHasher,
    embedder: Arc<dyn Embedder>,
    store: VectorStore,
    index: Arc<BucketIndex>,
    amplified: AmplifiedSearch,
    bucket_search: BucketSearch,
    events: Option<Arc<dyn EventSink>>,
    monitor: PerformanceMonitor,
    /// Held across each paired store + index mutation and across rebuilds.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dir", &self.dir)
            .field("capability", &self.capability)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens `dir` with the stub embedder and a JSON-lines audit log in `dir`.
    pub async fn open(dir: impl AsRef<Path>, config: SvdbConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let sink: Arc<dyn EventSink> = Arc::new(JsonlEventLog::new(dir.join(EVENTS_FILE)));
        Self::open_with(dir, config, Arc::new(StubEmbedder::default()), Some(sink)).await
    }

    pub async fn open_with(
        dir: impl AsRef<Path>,
        config: SvdbConfig,
        embedder: Arc<dyn Embedder>,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();
        let capability =
            BackendCapability::resolve(config.backend, svdb_fingerprint::simulator_compiled());
        let hasher = FingerprintHasher::from_config(&config, capability)?;
        let store = VectorStore::open(dir.join(VECTORS_FILE)).await?;

        let mut index = BucketIndex::new(config.bucket_dimension);
        if let Some(sink) = &events {
            index = index.with_event_sink(sink.clone());
        }
        let index = Arc::new(index);

        let db = Self {
            amplified: AmplifiedSearch::new(config.similarity_threshold, capability),
            bucket_search: BucketSearch::new(index.clone(), config.max_buckets),
            dir,
            config,
            capability,
            hasher,
            embedder,
            store,
            index,
            events,
            monitor: PerformanceMonitor::new(),
            write_lock: Mutex::new(()),
        };
        let indexed = db.load_index().await?;
        log::info!(
            "Opened SVDB at {} ({indexed} items indexed, backend {})",
            db.dir.display(),
            capability.as_str()
        );
        Ok(db)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn config(&self) -> &SvdbConfig {
        &self.config
    }

    #[must_use]
    pub const fn capability(&self) -> BackendCapability {
        self.capability
    }

    #[must_use]
    pub const fn hasher(&self) -> &FingerprintHasher {
        &self.hasher
    }

    #[must_use]
    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    #[must_use]
    pub fn index(&self) -> &BucketIndex {
        &self.index
    }

    /// Embeds `content`, fingerprints each chunk, then stores and indexes it.
    pub async fn store_content(&self, content: &str) -> Result<String> {
        let mut op = self.begin("store_content");
        let result = self.store_content_inner(content).await;
        self.finish(&mut op, &result, |id| json!({ "item_id": id, "chars": content.chars().count() }));
        result
    }

    async fn store_content_inner(&self, content: &str) -> Result<String> {
        let chunks = self.embedder.embed(content).await?;
        if chunks.is_empty() {
            return Err(EngineError::Embedding("content produced no chunks".to_string()));
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let pointers = self
            .hasher
            .batch_hash_to_vectors(&texts, self.config.bucket_dimension)?;
        let embeddings = chunks.into_iter().map(|c| c.vector).collect();
        self.write_item(embeddings, pointers, None).await
    }

    /// Stores pre-computed vectors and indexes their pointers.
    ///
    /// If indexing fails the store write is undone, so the index never
    /// references data the store does not hold (and vice versa).
    pub async fn store_vectors(
        &self,
        embeddings: Vec<Vec<f32>>,
        pointers: Vec<Vec<f32>>,
        item_id: Option<String>,
    ) -> Result<String> {
        let mut op = self.begin("store_vectors");
        let count = embeddings.len();
        let result = self.write_item(embeddings, pointers, item_id).await;
        self.finish(&mut op, &result, |id| json!({ "item_id": id, "vectors": count }));
        result
    }

    async fn write_item(
        &self,
        embeddings: Vec<Vec<f32>>,
        pointers: Vec<Vec<f32>>,
        item_id: Option<String>,
    ) -> Result<String> {
        let started = Instant::now();
        let dimension = self.index.dimension();
        if let Some(bad) = pointers.iter().find(|p| p.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            }
            .into());
        }
        let _writer = self.write_lock.lock().await;
        let previous = match &item_id {
            Some(id) => self.store.retrieve(id).await.ok(),
            None => None,
        };
        let replaced = previous.is_some();
        let index_pointers = pointers.clone();
        let id = self.store.store(embeddings, pointers, item_id).await?;

        if let Err(err) = self.index.add(&id, &index_pointers) {
            log::warn!("Indexing item {id} failed, rolling back store write: {err}");
            let rollback = match previous {
                Some(old) => self
                    .store
                    .store(old.embeddings, old.pointers, Some(id.clone()))
                    .await
                    .map(|_| ()),
                None => self.store.delete(&id).await,
            };
            if let Err(rollback_err) = rollback {
                log::warn!("Rollback of item {id} failed: {rollback_err}");
            }
            return Err(err.into());
        }

        self.monitor.record("store", started.elapsed());
        if !replaced {
            self.monitor.add_items(1);
        }
        Ok(id)
    }

    pub async fn retrieve(&self, item_id: &str) -> Result<VectorRecord> {
        Ok(self.store.retrieve(item_id).await?)
    }

    /// Removes the item from the store and the index; `NotFound` if unknown.
    pub async fn delete(&self, item_id: &str) -> Result<()> {
        let mut op = self.begin("delete");
        let started = Instant::now();
        let result = self.delete_inner(item_id).await;
        self.monitor.record("delete", started.elapsed());
        self.finish(&mut op, &result, |()| json!({ "item_id": item_id }));
        result
    }

    async fn delete_inner(&self, item_id: &str) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        self.store.delete(item_id).await?;
        self.index.remove(item_id);
        Ok(())
    }

    /// Ranks stored items against an embedding-space query vector.
    ///
    /// Pointer-aware modes fingerprint the query vector's bytes.
    pub async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ScoredItem>> {
        let pointer = match mode {
            SearchMode::Bucket | SearchMode::Pointers => Some(self.pointer_for_vector(query)?),
            SearchMode::Exact | SearchMode::Amplified => None,
        };
        self.run_search(query, pointer.as_deref(), top_k, mode).await
    }

    /// Embeds `text` (first chunk) and fingerprints it for pointer-aware modes.
    pub async fn search_content(
        &self,
        text: &str,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ScoredItem>> {
        let chunk = self
            .embedder
            .embed(text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Embedding("query produced no chunks".to_string()))?;
        let pointer = self
            .hasher
            .hash_to_vector(&chunk.content, self.config.bucket_dimension)?;
        self.run_search(&chunk.vector, Some(&pointer), top_k, mode).await
    }

    async fn run_search(
        &self,
        query: &[f32],
        pointer: Option<&[f32]>,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ScoredItem>> {
        let mut op = self.begin("search");
        let started = Instant::now();
        let result = self.dispatch(query, pointer, top_k, mode).await;
        let elapsed = started.elapsed();
        self.monitor.record_query(elapsed);
        self.finish(&mut op, &result, |hits| {
            json!({
                "mode": mode.as_str(),
                "results": hits.len(),
                "search_time": elapsed.as_secs_f64(),
            })
        });
        result
    }

    async fn dispatch(
        &self,
        query: &[f32],
        pointer: Option<&[f32]>,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<ScoredItem>> {
        let mut request = Query::new(query);
        if let Some(pointer) = pointer {
            request = request.with_pointer(pointer);
        }
        let hits = match mode {
            SearchMode::Exact => ExactSearch.search(request, &self.store, top_k).await?,
            SearchMode::Amplified => self.amplified.search(request, &self.store, top_k).await?,
            SearchMode::Bucket => self.bucket_search.search(request, &self.store, top_k).await?,
            SearchMode::Pointers => {
                let pointer = pointer.ok_or(svdb_search::SearchError::MissingPointer)?;
                self.store
                    .search_with_pointers(query, pointer, top_k, self.config.pointer_weight)
                    .await?
            }
        };
        Ok(hits)
    }

    /// Rebuilds the bucket index from the store alone; returns items indexed.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let mut op = self.begin("rebuild_index");
        let started = Instant::now();
        let result = self.load_index().await;
        self.monitor.record("rebuild_index", started.elapsed());
        self.finish(&mut op, &result, |count| json!({ "items": count }));
        result
    }

    /// Builds the index from a store snapshot and swaps it in whole.
    async fn load_index(&self) -> Result<usize> {
        let _writer = self.write_lock.lock().await;
        let items = self
            .store
            .records()
            .await
            .into_iter()
            .filter(|record| !record.pointers.is_empty())
            .map(|record| (record.item_id, record.pointers));
        let indexed = self.index.replace_all(items)?;
        log::info!("Bucket index holds {indexed} items in {} buckets", self.index.bucket_count());
        Ok(indexed)
    }

    pub async fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            items: self.store.len().await,
            vectors: self.store.vector_count().await,
            buckets: self.index.bucket_count(),
            indexed_items: self.index.indexed_item_count(),
        }
    }

    #[must_use]
    pub fn performance(&self) -> PerformanceSnapshot {
        self.monitor.snapshot()
    }

    #[must_use]
    pub fn search_stats(&self) -> SearchStats {
        self.amplified.stats()
    }

    fn pointer_for_vector(&self, vector: &[f32]) -> Result<Vec<f32>> {
        let bytes: Vec<u8> = vector.iter().flat_map(|v| v.to_le_bytes()).collect();
        Ok(self
            .hasher
            .hash_to_vector(&bytes, self.config.bucket_dimension)?)
    }

    fn begin(&self, operation_type: &str) -> OperationEvent {
        let event = OperationEvent {
            operation_id: uuid::Uuid::new_v4().to_string(),
            operation_type: operation_type.to_string(),
            start_time: unix_timestamp(),
            end_time: None,
            status: OperationStatus::Running,
            details: serde_json::Value::Null,
        };
        if let Some(sink) = &self.events {
            sink.record_operation(&event);
        }
        event
    }

    fn finish<T>(
        &self,
        event: &mut OperationEvent,
        result: &Result<T>,
        details: impl FnOnce(&T) -> serde_json::Value,
    ) {
        event.end_time = Some(unix_timestamp());
        match result {
            Ok(value) => {
                event.status = OperationStatus::Success;
                event.details = details(value);
            }
            Err(err) => {
                event.status = OperationStatus::Failed;
                event.details = json!({ "error": err.to_string() });
            }
        }
        if let Some(sink) = &self.events {
            sink.record_operation(event);
        }
    }
}
