use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;
use svdb_bucket_index::{bucket_id_for, BucketIndex};
use svdb_fingerprint::FingerprintHasher;
use svdb_protocol::BackendCapability;

const DIM: usize = 16;

fn hasher() -> FingerprintHasher {
    FingerprintHasher::new(4, 2, 64, BackendCapability::Classical).expect("hasher")
}

fn pointers(chunks: &[&str]) -> Vec<Vec<f32>> {
    hasher()
        .batch_hash_to_vectors(chunks, DIM)
        .expect("pointers")
}

#[test]
fn merge_takes_best_chunk_across_buckets() {
    let index = BucketIndex::new(2);
    index
        .add("item", &[vec![0.9, 0.43589], vec![0.4, 0.9165]])
        .expect("add");
    let hits = index.search(&[1.0, 0.0], 3, 2).expect("search");
    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - 0.9).abs() < 1e-3, "{}", hits[0].score);
}

#[test]
fn hashed_chunks_land_in_their_content_buckets() {
    let index = BucketIndex::new(DIM);
    let chunk_pointers = pointers(&["alpha", "beta", "gamma"]);
    index.add("doc", &chunk_pointers).expect("add");

    let memberships = index.buckets_for("doc").expect("memberships");
    let expected: Vec<(u32, String)> = chunk_pointers
        .iter()
        .enumerate()
        .map(|(chunk, p)| (bucket_id_for(p), format!("doc_{chunk}")))
        .collect();
    assert_eq!(memberships, expected);

    for (bucket_id, sub_id) in &memberships {
        let bucket = index.bucket(*bucket_id).expect("bucket exists");
        assert!(bucket.contains(sub_id));
        assert!(bucket.centroid().is_some());
    }
}

#[test]
fn querying_with_a_stored_pointer_finds_its_item() {
    let index = BucketIndex::new(DIM);
    for name in ["a", "b", "c", "d"] {
        index.add(name, &pointers(&[name])).expect("add");
    }
    let query = pointers(&["c"]).remove(0);
    let hits = index.search(&query, 1, 4).expect("search");
    assert_eq!(hits[0].item_id, "c");
    assert!((hits[0].score - 1.0).abs() < 1e-4);
}

#[test]
fn add_then_remove_restores_empty_index() {
    let index = BucketIndex::new(DIM);
    index.add("doc", &pointers(&["x", "y"])).expect("add");
    assert!(index.remove("doc"));
    assert_eq!(index.bucket_count(), 0);
    assert_eq!(index.indexed_item_count(), 0);
    assert!(index.search(&pointers(&["x"])[0], 5, 3).expect("search").is_empty());
}

#[test]
fn concurrent_readers_see_consistent_results() {
    let index = BucketIndex::new(DIM);
    for i in 0..20 {
        let chunk = format!("chunk-{i}");
        index
            .add(&format!("item-{i}"), &pointers(&[chunk.as_str()]))
            .expect("add");
    }
    let query = pointers(&["chunk-7"]).remove(0);
    let expected = index.search(&query, 5, 20).expect("search");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    assert_eq!(index.search(&query, 5, 20).expect("search"), expected);
                }
            });
        }
    });
}

#[test]
fn readers_never_see_a_partial_replace() {
    const ITEMS: usize = 200;
    let items: Vec<(String, Vec<Vec<f32>>)> = (0..ITEMS)
        .map(|i| {
            let chunk = format!("chunk-{i}");
            (format!("item-{i}"), pointers(&[chunk.as_str()]))
        })
        .collect();
    let index = BucketIndex::new(DIM);
    index.replace_all(items.clone()).expect("initial load");

    let done = std::sync::atomic::AtomicBool::new(false);
    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut seen = HashSet::new();
            loop {
                seen.insert(index.indexed_item_count());
                if done.load(std::sync::atomic::Ordering::Acquire) {
                    return seen;
                }
            }
        });
        for _ in 0..20 {
            index.replace_all(items.clone()).expect("replace");
        }
        done.store(true, std::sync::atomic::Ordering::Release);
        let seen = reader.join().expect("reader thread");
        assert_eq!(seen, HashSet::from([ITEMS]));
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn proptest_memberships_match_bucket_contents(
        names in proptest::collection::hash_set("[a-z]{1,6}", 1..8),
        removed in 0usize..8,
    ) {
        let index = BucketIndex::new(DIM);
        let names: Vec<String> = names.into_iter().collect();
        for name in &names {
            let chunks = [format!("{name}-0"), format!("{name}-1")];
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            index.add(name, &pointers(&refs)).unwrap();
        }
        if let Some(victim) = names.get(removed) {
            prop_assert!(index.remove(victim));
        }

        let mut listed = HashSet::new();
        for bucket_id in index.bucket_ids() {
            let bucket = index.bucket(bucket_id).unwrap();
            prop_assert!(!bucket.is_empty());
            for entry in bucket.entries() {
                listed.insert(entry.sub_item_id());
            }
        }
        let mut expected = HashSet::new();
        for name in &names {
            if let Some(memberships) = index.buckets_for(name) {
                for (bucket_id, sub_id) in memberships {
                    prop_assert!(index.bucket(bucket_id).unwrap().contains(&sub_id));
                    expected.insert(sub_id);
                }
            }
        }
        prop_assert_eq!(listed, expected);
    }
}
