//! Vector helpers shared by every ranking path.
//!
//! All similarity in SVDB is "normalize both sides, then dot". Zero vectors
//! are left as-is, so they score `0.0` against anything.

use crate::ScoredItem;

#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Scales `vector` to unit length in place; a zero vector is left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm == 0.0 {
        return;
    }
    for value in vector {
        *value /= norm;
    }
}

#[must_use]
pub fn normalized(vector: &[f32]) -> Vec<f32> {
    let mut out = vector.to_vec();
    normalize(&mut out);
    out
}

#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity; `0.0` when lengths differ or either side is zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot(a, b) / (norm_a * norm_b)
}

/// Sorts by score descending and keeps the first `top_k`.
///
/// The sort is stable: equal scores keep the order they arrived in.
#[must_use]
pub fn rank_top_k(mut items: Vec<ScoredItem>, top_k: usize) -> Vec<ScoredItem> {
    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    items.truncate(top_k);
    items
}
