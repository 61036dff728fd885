use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use crate::strategy::{Query, SearchStrategy};
use async_trait::async_trait;
use std::sync::Arc;
use svdb_bucket_index::BucketIndex;
use svdb_protocol::vector::rank_top_k;
use svdb_protocol::ScoredItem;

/// Narrows candidates to the items in the buckets nearest the query pointer,
/// then ranks those items by exact embedding similarity.
#[derive(Debug, Clone)]
pub struct BucketSearch {
    index: Arc<BucketIndex>,
    max_buckets: usize,
}

impl BucketSearch {
    #[must_use]
    pub const fn new(index: Arc<BucketIndex>, max_buckets: usize) -> Self {
        Self { index, max_buckets }
    }

    #[must_use]
    pub const fn max_buckets(&self) -> usize {
        self.max_buckets
    }
}

#[async_trait]
impl SearchStrategy for BucketSearch {
    fn name(&self) -> &'static str {
        "bucket"
    }

    async fn search(
        &self,
        query: Query<'_>,
        corpus: &dyn Corpus,
        top_k: usize,
    ) -> Result<Vec<ScoredItem>> {
        let vector = query.require_vector()?;
        let pointer = query.pointer.ok_or(SearchError::MissingPointer)?;

        let candidates: Vec<String> = self
            .index
            .search(pointer, self.index.indexed_item_count(), self.max_buckets)?
            .into_iter()
            .map(|hit| hit.item_id)
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let scored = corpus.similarities_for(vector, &candidates).await?;
        log::debug!(
            "Bucket search: {} candidates from {} buckets, {} scored",
            candidates.len(),
            self.max_buckets,
            scored.len()
        );
        Ok(rank_top_k(scored, top_k))
    }
}
