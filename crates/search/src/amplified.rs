use crate::corpus::Corpus;
use crate::error::Result;
use crate::strategy::{Query, SearchStrategy};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use svdb_protocol::vector::rank_top_k;
use svdb_protocol::{BackendCapability, ScoredItem};

pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// `⌊(π/4)·√n⌋`, the optimal number of amplification rounds over `n` items.
#[must_use]
pub fn amplification_rounds(n: usize) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let rounds = (std::f64::consts::FRAC_PI_4 * (n as f64).sqrt()).floor() as usize;
    rounds
}

/// Probability of measuring a marked item after `rounds` rounds with
/// `marked` of `n` items marked: `sin²((2r+1)·asin(√(m/n)))`.
#[must_use]
pub fn success_probability(n: usize, marked: usize, rounds: usize) -> f64 {
    if n == 0 || marked == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let theta = ((marked.min(n) as f64) / (n as f64)).sqrt().asin();
    #[allow(clippy::cast_precision_loss)]
    let angle = (2.0 * rounds as f64 + 1.0) * theta;
    angle.sin().powi(2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStats {
    pub search_count: u64,
    pub last_search_ms: f64,
    pub last_rounds: usize,
    pub last_marked: usize,
    pub last_success_probability: f64,
    /// The last search ran as a plain exact scan; nothing was marked.
    pub last_degraded: bool,
    pub capability: BackendCapability,
}

impl SearchStats {
    const fn new(capability: BackendCapability) -> Self {
        Self {
            search_count: 0,
            last_search_ms: 0.0,
            last_rounds: 0,
            last_marked: 0,
            last_success_probability: 0.0,
            last_degraded: false,
            capability,
        }
    }
}

/// Threshold-marked candidates ranked by exact similarity.
///
/// Items whose best similarity exceeds the threshold are "marked"; only
/// marked items are returned, ordered exactly as [`crate::ExactSearch`]
/// would order them. With [`BackendCapability::Classical`] the strategy
/// behaves as exact search.
#[derive(Debug)]
pub struct AmplifiedSearch {
    threshold: f32,
    capability: BackendCapability,
    stats: Mutex<SearchStats>,
}

impl AmplifiedSearch {
    #[must_use]
    pub const fn new(threshold: f32, capability: BackendCapability) -> Self {
        Self {
            threshold,
            capability,
            stats: Mutex::new(SearchStats::new(capability)),
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub const fn capability(&self) -> BackendCapability {
        self.capability
    }

    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, started: Instant, rounds: usize, marked: usize, probability: f64, degraded: bool) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.search_count += 1;
        stats.last_search_ms = started.elapsed().as_secs_f64() * 1000.0;
        stats.last_rounds = rounds;
        stats.last_marked = marked;
        stats.last_success_probability = probability;
        stats.last_degraded = degraded;
    }
}

impl Default for AmplifiedSearch {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, BackendCapability::Simulator)
    }
}

#[async_trait]
impl SearchStrategy for AmplifiedSearch {
    fn name(&self) -> &'static str {
        "amplified"
    }

    async fn search(
        &self,
        query: Query<'_>,
        corpus: &dyn Corpus,
        top_k: usize,
    ) -> Result<Vec<ScoredItem>> {
        let vector = query.require_vector()?;
        let started = Instant::now();

        if !self.capability.is_simulator() {
            let results = corpus.exact_search(vector, top_k).await?;
            self.record(started, 0, 0, 0.0, true);
            log::debug!("Amplified search degraded to exact scan ({} results)", results.len());
            return Ok(results);
        }

        let scores = corpus.similarities(vector).await?;
        let n = scores.len();
        let rounds = amplification_rounds(n);
        let marked: Vec<ScoredItem> = scores
            .into_iter()
            .filter(|item| item.score > self.threshold)
            .collect();
        let probability = success_probability(n, marked.len(), rounds);
        self.record(started, rounds, marked.len(), probability, false);

        log::debug!(
            "Amplified search: {} of {n} items marked (threshold {}, {rounds} rounds, p={probability:.3})",
            marked.len(),
            self.threshold
        );
        Ok(rank_top_k(marked, top_k))
    }
}
