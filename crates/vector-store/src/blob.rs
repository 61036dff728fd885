//! Binary encoding for a list of equal-length `f32` vectors.
//!
//! Layout: `SVB1` magic, `u32` LE vector count, `u32` LE dimension, then
//! `count * dimension` little-endian `f32` values.

use crate::error::{Result, VectorStoreError};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const BLOB_MAGIC: &[u8; 4] = b"SVB1";
const HEADER_LEN: usize = 12;

/// Common length of `vectors`, or `DimensionMismatch` on the first ragged one.
pub(crate) fn uniform_dimension(vectors: &[Vec<f32>]) -> Result<Option<usize>> {
    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    let dimension = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(VectorStoreError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(Some(dimension))
}

pub(crate) fn encode_vectors(vectors: &[Vec<f32>]) -> Vec<u8> {
    let dimension = vectors.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(HEADER_LEN + vectors.len() * dimension * 4);
    out.extend_from_slice(BLOB_MAGIC);
    #[allow(clippy::cast_possible_truncation)]
    {
        out.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
        out.extend_from_slice(&(dimension as u32).to_le_bytes());
    }
    for vector in vectors {
        for value in vector {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

pub(crate) fn decode_vectors(bytes: &[u8]) -> Result<Vec<Vec<f32>>> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != BLOB_MAGIC {
        return Err(VectorStoreError::CorruptBlob("missing header".to_string()));
    }
    let count = read_u32(&bytes[4..8])? as usize;
    let dimension = read_u32(&bytes[8..12])? as usize;
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN));
    if expected_len != Some(bytes.len()) {
        return Err(VectorStoreError::CorruptBlob(format!(
            "{count}x{dimension} header does not match {} bytes",
            bytes.len()
        )));
    }

    let values: Vec<f32> = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if dimension == 0 {
        return Ok(vec![Vec::new(); count]);
    }
    Ok(values.chunks_exact(dimension).map(<[f32]>::to_vec).collect())
}

pub(crate) fn encode_base64(vectors: &[Vec<f32>]) -> String {
    STANDARD.encode(encode_vectors(vectors))
}

pub(crate) fn decode_base64(text: &str) -> Result<Vec<Vec<f32>>> {
    let bytes = STANDARD
        .decode(text)
        .map_err(|err| VectorStoreError::CorruptBlob(err.to_string()))?;
    decode_vectors(&bytes)
}

fn read_u32(bytes: &[u8]) -> Result<u32> {
    let array: [u8; 4] = bytes
        .try_into()
        .map_err(|_| VectorStoreError::CorruptBlob("short length field".to_string()))?;
    Ok(u32::from_le_bytes(array))
}
