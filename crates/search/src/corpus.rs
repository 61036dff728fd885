use crate::error::Result;
use async_trait::async_trait;
use svdb_protocol::vector::rank_top_k;
use svdb_protocol::ScoredItem;
use svdb_vector_store::VectorStore;

/// Read access a ranking strategy needs from the stored items.
#[async_trait]
pub trait Corpus: Send + Sync {
    async fn item_count(&self) -> usize;

    /// Best embedding similarity of every item to `query`, in insertion order.
    async fn similarities(&self, query: &[f32]) -> Result<Vec<ScoredItem>>;

    /// Same as [`Corpus::similarities`] for the listed items only, still in
    /// insertion order.
    async fn similarities_for(&self, query: &[f32], item_ids: &[String]) -> Result<Vec<ScoredItem>>;

    async fn exact_search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredItem>> {
        Ok(rank_top_k(self.similarities(query).await?, top_k))
    }
}

#[async_trait]
impl Corpus for VectorStore {
    async fn item_count(&self) -> usize {
        self.len().await
    }

    async fn similarities(&self, query: &[f32]) -> Result<Vec<ScoredItem>> {
        Ok(self.scores(query).await?)
    }

    async fn similarities_for(&self, query: &[f32], item_ids: &[String]) -> Result<Vec<ScoredItem>> {
        Ok(self.scores_for(query, item_ids).await?)
    }

    async fn exact_search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredItem>> {
        Ok(self.search(query, top_k).await?)
    }
}
