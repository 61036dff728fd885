//! # SVDB Fingerprint
//!
//! Deterministic "tiny pointer" hashing.
//!
//! ## Pipeline
//!
//! ```text
//! bytes
//!   │
//!   ├──> SHAKE256 → 32-bit seed
//!   │
//!   ├──> Circuit layout (HMAC-derived angles, depth × num_qubits)
//!   │
//!   ├──> Distribution over 2^num_qubits bit-strings
//!   │      ├─> state-vector simulator (feature `circuit-sim`)
//!   │      └─> seeded classical fallback
//!   │
//!   ├──> Fixed-point canonical encoding → SHAKE256 → 256-bit digest
//!   │
//!   └──> Pointer: digest bytes → [-1, 1]^dim, L2-normalized
//! ```
//!
//! ## Example
//!
//! ```
//! use svdb_fingerprint::FingerprintHasher;
//! use svdb_protocol::BackendCapability;
//!
//! let hasher = FingerprintHasher::new(8, 3, 1024, BackendCapability::Classical)?;
//! let pointer = hasher.hash_to_vector("hello world", 32)?;
//! assert_eq!(pointer.len(), 32);
//! assert_eq!(hasher.hash("hello world")?, hasher.hash("hello world")?);
//! # Ok::<(), svdb_fingerprint::FingerprintError>(())
//! ```

use std::collections::BTreeMap;

pub mod circuit;
mod digest;
mod error;
mod fallback;
mod hasher;
#[cfg(feature = "circuit-sim")]
mod simulator;

pub use digest::{digest_to_vector, Digest, DIGEST_LEN};
pub use error::{FingerprintError, Result};
pub use fallback::fallback_distribution;
pub use hasher::FingerprintHasher;
#[cfg(feature = "circuit-sim")]
pub use simulator::StateVector;
pub use svdb_protocol::DEFAULT_POINTER_DIMENSION;

/// Measurement counts keyed by bit-string, in lexicographic order.
pub type Distribution = BTreeMap<String, u64>;

/// Whether this build carries the circuit simulator.
#[must_use]
pub const fn simulator_compiled() -> bool {
    cfg!(feature = "circuit-sim")
}

pub(crate) fn bitstring(index: usize, num_qubits: usize) -> String {
    format!("{index:0num_qubits$b}")
}
