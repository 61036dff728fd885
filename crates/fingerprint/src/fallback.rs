use crate::{bitstring, Distribution};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Splits `shots` across all `2^num_qubits` bit-strings by seeded weights.
///
/// Weights are integers, so the split is exact: every bit-string gets
/// `floor(w_i * shots / total)`, and the last one takes the remainder.
pub fn fallback_distribution(num_qubits: usize, shots: u32, seed: u32) -> Distribution {
    let states = 1usize << num_qubits;
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
    // +1 keeps the total non-zero.
    let weights: Vec<u64> = (0..states)
        .map(|_| u64::from(rng.next_u32()) + 1)
        .collect();
    let total: u128 = weights.iter().map(|w| u128::from(*w)).sum();

    let shots = u64::from(shots);
    let mut remaining = shots;
    let mut distribution = Distribution::new();
    for (idx, weight) in weights.iter().enumerate().take(states - 1) {
        #[allow(clippy::cast_possible_truncation)]
        let count = (u128::from(*weight) * u128::from(shots) / total) as u64;
        remaining -= count;
        distribution.insert(bitstring(idx, num_qubits), count);
    }
    distribution.insert(bitstring(states - 1, num_qubits), remaining);
    distribution
}
