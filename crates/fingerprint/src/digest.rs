use crate::error::{FingerprintError, Result};
use crate::Distribution;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use std::fmt::Write;

pub const DIGEST_LEN: usize = 32;

/// Fixed-point scale for probabilities (18 decimal digits).
const FIXED_POINT_SCALE: u128 = 1_000_000_000_000_000_000;

pub type Digest = [u8; DIGEST_LEN];

/// First four bytes of `SHAKE256(data)`, big-endian.
pub fn seed_from_input(data: &[u8]) -> u32 {
    let mut hasher = Shake256::default();
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; 4];
    reader.read(&mut out);
    u32::from_be_bytes(out)
}

/// Canonical byte encoding of a distribution.
///
/// Bit-strings are visited in lexicographic order (the `BTreeMap` order).
/// Each entry is the probability as a 16-byte big-endian integer scaled by
/// 10^18, followed by the ASCII bit-string.
pub fn encode_distribution(distribution: &Distribution) -> Vec<u8> {
    let total: u128 = distribution.values().map(|c| u128::from(*c)).sum();
    let mut out = Vec::with_capacity(distribution.len() * 32);
    for (bits, count) in distribution {
        let fixed = if total == 0 {
            0
        } else {
            u128::from(*count) * FIXED_POINT_SCALE / total
        };
        out.extend_from_slice(&fixed.to_be_bytes());
        out.extend_from_slice(bits.as_bytes());
    }
    out
}

/// 256-bit SHAKE256 digest of the canonical encoding.
pub fn compress(distribution: &Distribution) -> Digest {
    let mut hasher = Shake256::default();
    hasher.update(&encode_distribution(distribution));
    let mut reader = hasher.finalize_xof();
    let mut out = [0u8; DIGEST_LEN];
    reader.read(&mut out);
    out
}

pub fn to_hex(digest: &Digest) -> String {
    let mut out = String::with_capacity(DIGEST_LEN * 2);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Expands digest bytes to `dimension` components in `[-1, 1]`, L2-normalized.
///
/// Bytes repeat cyclically when `dimension` exceeds the digest length. An
/// all-zero result stays zero instead of dividing by zero.
pub fn digest_to_vector(digest: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if dimension == 0 || digest.is_empty() {
        return Err(FingerprintError::InvalidDimension(dimension));
    }
    let mut vector: Vec<f32> = digest
        .iter()
        .cycle()
        .take(dimension)
        .map(|b| f32::from(*b) / 127.5 - 1.0)
        .collect();
    svdb_protocol::vector::normalize(&mut vector);
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dist(entries: &[(&str, u64)]) -> Distribution {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn encoding_is_fixed_width_per_entry() {
        let encoded = encode_distribution(&dist(&[("00", 1), ("11", 3)]));
        assert_eq!(encoded.len(), 2 * (16 + 2));

        let mut quarter = [0u8; 16];
        quarter.copy_from_slice(&encoded[..16]);
        assert_eq!(u128::from_be_bytes(quarter), FIXED_POINT_SCALE / 4);
        assert_eq!(&encoded[16..18], b"00");
    }

    #[test]
    fn encoding_ignores_insertion_order() {
        let mut a = Distribution::new();
        a.insert("10".to_string(), 2);
        a.insert("01".to_string(), 5);
        let mut b = Distribution::new();
        b.insert("01".to_string(), 5);
        b.insert("10".to_string(), 2);
        assert_eq!(compress(&a), compress(&b));
    }

    #[test]
    fn hex_is_lowercase_and_full_length() {
        let digest = compress(&dist(&[("0", 1)]));
        let hex = to_hex(&digest);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn vector_repeats_digest_cyclically() {
        let digest: Vec<u8> = (0u8..32).collect();
        let vector = digest_to_vector(&digest, 64).unwrap();
        for i in 0..32 {
            assert_eq!(vector[i].to_bits(), vector[i + 32].to_bits());
        }
        let short = digest_to_vector(&digest, 5).unwrap();
        assert_eq!(short.len(), 5);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            digest_to_vector(&[1, 2, 3], 0),
            Err(FingerprintError::InvalidDimension(0))
        ));
    }

    #[test]
    fn seed_is_stable() {
        assert_eq!(seed_from_input(b"hello"), seed_from_input(b"hello"));
        assert_ne!(seed_from_input(b"hello"), seed_from_input(b"hellp"));
    }
}
