use pretty_assertions::assert_eq;
use proptest::prelude::*;
use svdb_vector_store::{VectorStore, VectorStoreError};
use tempfile::TempDir;

fn pointer() -> Vec<f32> {
    vec![0.6, 0.8]
}

async fn seeded_store(tmp: &TempDir) -> VectorStore {
    let store = VectorStore::open(tmp.path().join("vectors.json"))
        .await
        .expect("open");
    for (id, embedding) in [
        ("item1", vec![1.0, 0.0]),
        ("item2", vec![0.0, 1.0]),
        ("item3", vec![0.7, 0.7]),
    ] {
        store
            .store(vec![embedding], vec![pointer()], Some(id.to_string()))
            .await
            .expect("store");
    }
    store
}

#[tokio::test]
async fn exact_search_ranks_by_cosine() {
    let tmp = TempDir::new().unwrap();
    let store = seeded_store(&tmp).await;

    let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.item_id.as_str()).collect();
    assert_eq!(ids, vec!["item1", "item3"]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
}

#[tokio::test]
async fn item_scores_its_best_embedding() {
    let tmp = TempDir::new().unwrap();
    let store = VectorStore::open(tmp.path().join("v.json")).await.unwrap();
    store
        .store(
            vec![vec![0.0, 1.0], vec![1.0, 0.1]],
            vec![pointer(), pointer()],
            Some("multi".into()),
        )
        .await
        .unwrap();
    store
        .store(vec![vec![0.9, 0.5]], vec![pointer()], Some("single".into()))
        .await
        .unwrap();

    let hits = store.search(&[1.0, 0.0], 5).await.unwrap();
    assert_eq!(hits[0].item_id, "multi");
    assert!(hits[0].score > 0.99);
}

#[tokio::test]
async fn retrieve_returns_what_was_stored() {
    let tmp = TempDir::new().unwrap();
    let store = VectorStore::open(tmp.path().join("v.json")).await.unwrap();
    let embeddings = vec![vec![0.1, 0.2, 0.3], vec![-1.5, 0.0, 2.25]];
    let pointers = vec![vec![0.6, 0.8], vec![1.0, 0.0]];
    let id = store
        .store(embeddings.clone(), pointers.clone(), None)
        .await
        .unwrap();

    let record = store.retrieve(&id).await.unwrap();
    assert_eq!(record.item_id, id);
    assert_eq!(record.embeddings, embeddings);
    assert_eq!(record.pointers, pointers);
    assert!(record.timestamp > 0.0);
}

#[tokio::test]
async fn second_delete_reports_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = seeded_store(&tmp).await;

    store.delete("item2").await.unwrap();
    let err = store.delete("item2").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        store.retrieve("item2").await,
        Err(VectorStoreError::NotFound(_))
    ));
    assert_eq!(store.all_ids().await, vec!["item1", "item3"]);
}

#[tokio::test]
async fn writes_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("vectors.json");
    {
        let store = seeded_store(&tmp).await;
        store.delete("item1").await.unwrap();
        store
            .store(vec![vec![1.0 / 3.0, 0.1]], vec![pointer()], Some("item4".into()))
            .await
            .unwrap();
    }

    let reopened = VectorStore::open(&path).await.unwrap();
    assert_eq!(reopened.all_ids().await, vec!["item2", "item3", "item4"]);
    assert_eq!(reopened.dimension().await, Some(2));
    let record = reopened.retrieve("item4").await.unwrap();
    assert_eq!(record.embeddings[0][0].to_bits(), (1.0f32 / 3.0).to_bits());

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["schema_version"], 1);
}

#[tokio::test]
async fn open_fresh_discards_previous_snapshot() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("vectors.json");
    drop(seeded_store(&tmp).await);

    let fresh = VectorStore::open_fresh(&path).await.unwrap();
    assert!(fresh.is_empty().await);
    assert!(VectorStore::open(&path).await.unwrap().is_empty().await);
}

#[tokio::test]
async fn rejects_unknown_schema_version() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("vectors.json");
    std::fs::write(
        &path,
        r#"{"schema_version": 99, "last_update": 0.0, "vectors": []}"#,
    )
    .unwrap();
    let err = VectorStore::open(&path).await.unwrap_err();
    assert!(matches!(
        err,
        VectorStoreError::UnsupportedSchema {
            found: 99,
            expected: 1
        }
    ));
}

#[tokio::test]
async fn concurrent_readers_during_writes() {
    let tmp = TempDir::new().unwrap();
    let store = std::sync::Arc::new(seeded_store(&tmp).await);

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                store
                    .store(vec![vec![0.5, 0.5]], vec![vec![0.6, 0.8]], Some(format!("w{i}")))
                    .await
                    .unwrap();
            }
        })
    };
    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                let hits = store.search(&[1.0, 0.0], 1).await.unwrap();
                assert_eq!(hits[0].item_id, "item1");
            }
        })
    };
    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(store.len().await, 13);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn proptest_search_is_sorted_and_bounded(
        embeddings in proptest::collection::vec(
            proptest::collection::vec(-1.0f32..1.0, 3),
            1..12,
        ),
        top_k in 1usize..6,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let tmp = TempDir::new().unwrap();
        let hits = runtime.block_on(async {
            let store = VectorStore::open(tmp.path().join("p.json")).await.unwrap();
            for embedding in &embeddings {
                store
                    .store(vec![embedding.clone()], vec![vec![1.0]], None)
                    .await
                    .unwrap();
            }
            store.search(&[0.3, -0.2, 0.9], top_k).await.unwrap()
        });

        prop_assert_eq!(hits.len(), top_k.min(embeddings.len()));
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
