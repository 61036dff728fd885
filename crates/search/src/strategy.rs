use crate::amplified::AmplifiedSearch;
use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use svdb_protocol::{BackendCapability, ScoredItem};

/// A query embedding plus, for pointer-aware strategies, its fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub vector: &'a [f32],
    pub pointer: Option<&'a [f32]>,
}

impl<'a> Query<'a> {
    #[must_use]
    pub const fn new(vector: &'a [f32]) -> Self {
        Self {
            vector,
            pointer: None,
        }
    }

    #[must_use]
    pub fn with_pointer(mut self, pointer: &'a [f32]) -> Self {
        self.pointer = Some(pointer);
        self
    }

    pub(crate) fn require_vector(&self) -> Result<&'a [f32]> {
        if self.vector.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        Ok(self.vector)
    }
}

impl<'a> From<&'a [f32]> for Query<'a> {
    fn from(vector: &'a [f32]) -> Self {
        Self::new(vector)
    }
}

/// Ranks corpus items against a query.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        query: Query<'_>,
        corpus: &dyn Corpus,
        top_k: usize,
    ) -> Result<Vec<ScoredItem>>;
}

/// Exhaustive scan; the reference ranking every other strategy is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSearch;

#[async_trait]
impl SearchStrategy for ExactSearch {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn search(
        &self,
        query: Query<'_>,
        corpus: &dyn Corpus,
        top_k: usize,
    ) -> Result<Vec<ScoredItem>> {
        let vector = query.require_vector()?;
        corpus.exact_search(vector, top_k).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Exact,
    Amplified,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "amplified" | "grover" => Ok(Self::Amplified),
            other => Err(format!("unknown search strategy '{other}'")),
        }
    }
}

#[must_use]
pub fn strategy_for(
    kind: StrategyKind,
    capability: BackendCapability,
    threshold: f32,
) -> Box<dyn SearchStrategy> {
    match kind {
        StrategyKind::Exact => Box::new(ExactSearch),
        StrategyKind::Amplified => Box::new(AmplifiedSearch::new(threshold, capability)),
    }
}
