use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use svdb_bucket_index::BucketIndex;
use svdb_fingerprint::FingerprintHasher;
use svdb_protocol::{BackendCapability, ScoredItem};
use svdb_search::{
    strategy_for, AmplifiedSearch, BucketSearch, ExactSearch, Query, SearchError,
    SearchStrategy, StrategyKind,
};
use svdb_vector_store::VectorStore;
use tempfile::TempDir;

const POINTER_DIM: usize = 8;

fn ids(hits: &[ScoredItem]) -> Vec<&str> {
    hits.iter().map(|h| h.item_id.as_str()).collect()
}

async fn corpus(tmp: &TempDir, embeddings: &[(&str, Vec<f32>)]) -> VectorStore {
    let store = VectorStore::open(tmp.path().join("vectors.json"))
        .await
        .expect("open");
    for (id, embedding) in embeddings {
        store
            .store(
                vec![embedding.clone()],
                vec![vec![1.0; POINTER_DIM]],
                Some((*id).to_string()),
            )
            .await
            .expect("store");
    }
    store
}

fn three_items() -> Vec<(&'static str, Vec<f32>)> {
    vec![
        ("item1", vec![1.0, 0.0]),
        ("item2", vec![0.0, 1.0]),
        ("item3", vec![0.7, 0.7]),
    ]
}

#[tokio::test]
async fn exact_strategy_matches_store_search() {
    let tmp = TempDir::new().unwrap();
    let store = corpus(&tmp, &three_items()).await;
    let query = [1.0, 0.0];

    let via_strategy = ExactSearch.search(Query::new(&query), &store, 2).await.unwrap();
    let direct = store.search(&query, 2).await.unwrap();
    assert_eq!(via_strategy, direct);
    assert_eq!(ids(&via_strategy), vec!["item1", "item3"]);
}

#[tokio::test]
async fn amplified_returns_only_marked_items() {
    let tmp = TempDir::new().unwrap();
    let store = corpus(&tmp, &three_items()).await;
    let search = AmplifiedSearch::new(0.7, BackendCapability::Simulator);

    let hits = search.search(Query::new(&[1.0, 0.0]), &store, 5).await.unwrap();
    assert_eq!(ids(&hits), vec!["item1", "item3"]);

    let stats = search.stats();
    assert_eq!(stats.search_count, 1);
    assert_eq!(stats.last_marked, 2);
    assert_eq!(stats.last_rounds, 1);
    assert!(stats.last_success_probability > 0.0);
    assert!(!stats.last_degraded);
}

#[tokio::test]
async fn amplified_without_marked_items_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = corpus(&tmp, &three_items()).await;
    let search = AmplifiedSearch::new(0.7, BackendCapability::Simulator);
    let hits = search.search(Query::new(&[-1.0, -1.0]), &store, 5).await.unwrap();
    assert!(hits.is_empty());
    assert_eq!(search.stats().last_marked, 0);
}

#[tokio::test]
async fn classical_capability_degrades_to_exact() {
    let tmp = TempDir::new().unwrap();
    let store = corpus(&tmp, &three_items()).await;
    let degraded = strategy_for(StrategyKind::Amplified, BackendCapability::Classical, 0.7);
    let query = [-1.0, -1.0];

    let hits = degraded.search(Query::new(&query), &store, 3).await.unwrap();
    assert_eq!(hits, store.search(&query, 3).await.unwrap());
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn degraded_search_reports_no_marked_items() {
    let tmp = TempDir::new().unwrap();
    let store = corpus(&tmp, &three_items()).await;
    let search = AmplifiedSearch::new(0.7, BackendCapability::Classical);

    let hits = search.search(Query::new(&[1.0, 0.0]), &store, 5).await.unwrap();
    assert_eq!(hits.len(), 3);

    let stats = search.stats();
    assert_eq!(stats.search_count, 1);
    assert!(stats.last_degraded);
    assert_eq!(stats.last_marked, 0);
    assert_eq!(stats.last_rounds, 0);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = corpus(&tmp, &three_items()).await;
    let err = ExactSearch.search(Query::new(&[]), &store, 3).await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));
}

#[tokio::test]
async fn bucket_search_reranks_candidates_exactly() {
    let tmp = TempDir::new().unwrap();
    let hasher = FingerprintHasher::new(4, 2, 64, BackendCapability::Classical).unwrap();
    let store = VectorStore::open(tmp.path().join("vectors.json")).await.unwrap();
    let index = Arc::new(BucketIndex::new(POINTER_DIM));

    for (id, content, embedding) in [
        ("near", "alpha", vec![0.9, 0.1]),
        ("far", "beta", vec![0.1, 0.9]),
        ("mid", "gamma", vec![0.6, 0.6]),
    ] {
        let pointer = hasher.hash_to_vector(content, POINTER_DIM).unwrap();
        store
            .store(vec![embedding], vec![pointer.clone()], Some(id.to_string()))
            .await
            .unwrap();
        index.add(id, &[pointer]).unwrap();
    }

    let search = BucketSearch::new(index.clone(), index.bucket_count());
    let query_pointer = hasher.hash_to_vector("alpha", POINTER_DIM).unwrap();
    let query = [1.0, 0.0];
    let hits = search
        .search(Query::new(&query).with_pointer(&query_pointer), &store, 3)
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec!["near", "mid", "far"]);

    let narrowed = BucketSearch::new(index, 1)
        .search(Query::new(&query).with_pointer(&query_pointer), &store, 3)
        .await
        .unwrap();
    assert_eq!(ids(&narrowed), vec!["near"]);

    assert!(matches!(
        search.search(Query::new(&query), &store, 3).await,
        Err(SearchError::MissingPointer)
    ));
}

#[tokio::test]
async fn bucket_search_breaks_ties_by_insertion_order() {
    let tmp = TempDir::new().unwrap();
    let hasher = FingerprintHasher::new(4, 2, 64, BackendCapability::Classical).unwrap();
    let store = VectorStore::open(tmp.path().join("vectors.json")).await.unwrap();
    let index = Arc::new(BucketIndex::new(POINTER_DIM));

    // "second" sits in the bucket nearest the query pointer, so the index
    // lists it first; both embeddings score the same.
    for (id, content) in [("first", "beta"), ("second", "alpha")] {
        let pointer = hasher.hash_to_vector(content, POINTER_DIM).unwrap();
        store
            .store(vec![vec![1.0, 0.0]], vec![pointer.clone()], Some(id.to_string()))
            .await
            .unwrap();
        index.add(id, &[pointer]).unwrap();
    }
    let query_pointer = hasher.hash_to_vector("alpha", POINTER_DIM).unwrap();
    let by_bucket = index.search(&query_pointer, 2, 2).unwrap();
    assert_eq!(ids(&by_bucket), vec!["second", "first"]);

    let hits = BucketSearch::new(index.clone(), 2)
        .search(Query::new(&[1.0, 0.0]).with_pointer(&query_pointer), &store, 2)
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec!["first", "second"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn proptest_amplified_is_threshold_filtered_exact(
        embeddings in proptest::collection::vec(
            proptest::collection::vec(-1.0f32..1.0, 3),
            1..16,
        ),
        query in proptest::collection::vec(-1.0f32..1.0, 3),
        threshold in 0.0f32..0.9,
        top_k in 1usize..8,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let tmp = TempDir::new().unwrap();
        let (amplified, exact) = runtime.block_on(async {
            let store = VectorStore::open(tmp.path().join("p.json")).await.unwrap();
            for (i, embedding) in embeddings.iter().enumerate() {
                store
                    .store(vec![embedding.clone()], vec![vec![1.0]], Some(format!("i{i}")))
                    .await
                    .unwrap();
            }
            let amplified = AmplifiedSearch::new(threshold, BackendCapability::Simulator)
                .search(Query::new(&query), &store, top_k)
                .await
                .unwrap();
            let exact = store.search(&query, embeddings.len()).await.unwrap();
            (amplified, exact)
        });

        prop_assert!(amplified.iter().all(|hit| hit.score > threshold));
        let expected: Vec<ScoredItem> = exact
            .into_iter()
            .filter(|hit| hit.score > threshold)
            .take(top_k)
            .collect();
        prop_assert_eq!(amplified, expected);
    }
}
