use crate::digest::{self, Digest};
use crate::error::{FingerprintError, Result};
use crate::fallback::fallback_distribution;
use crate::Distribution;
use svdb_protocol::{BackendCapability, BackendPreference, SvdbConfig};

const MAX_QUBITS: usize = 16;

/// Maps arbitrary bytes to a 256-bit digest and to normalized pointer vectors.
///
/// The output depends only on the input bytes, `num_qubits`, `depth`, `shots`
/// and the resolved [`BackendCapability`].
#[derive(Debug, Clone)]
pub struct FingerprintHasher {
    num_qubits: usize,
    depth: usize,
    shots: u32,
    capability: BackendCapability,
}

impl FingerprintHasher {
    pub fn new(
        num_qubits: usize,
        depth: usize,
        shots: u32,
        capability: BackendCapability,
    ) -> Result<Self> {
        if num_qubits == 0 || num_qubits > MAX_QUBITS {
            return Err(FingerprintError::InvalidConfig(format!(
                "num_qubits must be in 1..={MAX_QUBITS}, got {num_qubits}"
            )));
        }
        if shots == 0 {
            return Err(FingerprintError::InvalidConfig(
                "shots must be at least 1".to_string(),
            ));
        }

        let capability = if capability.is_simulator() && !crate::simulator_compiled() {
            log::debug!("Circuit simulator not compiled in; hasher uses classical fallback");
            BackendCapability::Classical
        } else {
            capability
        };

        Ok(Self {
            num_qubits,
            depth,
            shots,
            capability,
        })
    }

    pub fn from_config(config: &SvdbConfig, capability: BackendCapability) -> Result<Self> {
        Self::new(config.num_qubits, config.depth, config.shots, capability)
    }

    #[must_use]
    pub const fn capability(&self) -> BackendCapability {
        self.capability
    }

    #[must_use]
    pub const fn is_simulator_available(&self) -> bool {
        self.capability.is_simulator()
    }

    #[must_use]
    pub const fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn shots(&self) -> u32 {
        self.shots
    }

    /// Canonical bit-string counts for `data` (sums to `shots`).
    pub fn distribution(&self, data: impl AsRef<[u8]>) -> Result<Distribution> {
        let seed = digest::seed_from_input(data.as_ref());
        self.distribution_for_seed(seed)
    }

    fn distribution_for_seed(&self, seed: u32) -> Result<Distribution> {
        #[cfg(feature = "circuit-sim")]
        if self.capability.is_simulator() {
            let circuit = crate::circuit::Circuit::build(seed, self.num_qubits, self.depth)?;
            let state = crate::simulator::StateVector::run(&circuit);
            return Ok(state.sample(self.shots, seed));
        }

        Ok(fallback_distribution(self.num_qubits, self.shots, seed))
    }

    pub fn digest(&self, data: impl AsRef<[u8]>) -> Result<Digest> {
        let distribution = self.distribution(data)?;
        Ok(digest::compress(&distribution))
    }

    /// Lowercase hex of the 256-bit digest.
    pub fn hash(&self, data: impl AsRef<[u8]>) -> Result<String> {
        Ok(digest::to_hex(&self.digest(data)?))
    }

    pub fn hash_to_vector(&self, data: impl AsRef<[u8]>, dimension: usize) -> Result<Vec<f32>> {
        if dimension == 0 {
            return Err(FingerprintError::InvalidDimension(dimension));
        }
        let digest = self.digest(data)?;
        digest::digest_to_vector(&digest, dimension)
    }

    pub fn batch_hash_to_vectors<T: AsRef<[u8]>>(
        &self,
        inputs: &[T],
        dimension: usize,
    ) -> Result<Vec<Vec<f32>>> {
        inputs
            .iter()
            .map(|input| self.hash_to_vector(input, dimension))
            .collect()
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self {
            num_qubits: 8,
            depth: 3,
            shots: 1024,
            capability: BackendCapability::resolve(
                BackendPreference::Auto,
                crate::simulator_compiled(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classical() -> FingerprintHasher {
        FingerprintHasher::new(6, 3, 512, BackendCapability::Classical).unwrap()
    }

    #[test]
    fn hash_is_deterministic_across_instances() {
        let a = classical().hash("some content").unwrap();
        let b = classical().hash(b"some content").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_inputs_differ() {
        let hasher = classical();
        assert_ne!(hasher.hash("alpha").unwrap(), hasher.hash("beta").unwrap());
    }

    #[test]
    fn config_changes_digest() {
        let a = FingerprintHasher::new(6, 3, 512, BackendCapability::Classical).unwrap();
        let b = FingerprintHasher::new(6, 3, 256, BackendCapability::Classical).unwrap();
        assert_ne!(a.hash("x").unwrap(), b.hash("x").unwrap());
    }

    #[test]
    fn distribution_sums_to_shots() {
        let dist = classical().distribution("payload").unwrap();
        assert_eq!(dist.values().sum::<u64>(), 512);
        assert_eq!(dist.len(), 64);
    }

    #[test]
    fn vector_is_unit_length() {
        let vector = classical().hash_to_vector("payload", 32).unwrap();
        assert_eq!(vector.len(), 32);
        let norm = svdb_protocol::vector::l2_norm(&vector);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn batch_preserves_order() {
        let hasher = classical();
        let batch = hasher.batch_hash_to_vectors(&["a", "b"], 16).unwrap();
        assert_eq!(batch[0], hasher.hash_to_vector("a", 16).unwrap());
        assert_eq!(batch[1], hasher.hash_to_vector("b", 16).unwrap());
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(FingerprintHasher::new(0, 3, 10, BackendCapability::Classical).is_err());
        assert!(FingerprintHasher::new(4, 3, 0, BackendCapability::Classical).is_err());
        assert!(classical().hash_to_vector("x", 0).is_err());
    }

    #[cfg(feature = "circuit-sim")]
    #[test]
    fn simulator_path_is_deterministic() {
        let hasher = FingerprintHasher::new(5, 3, 256, BackendCapability::Simulator).unwrap();
        assert!(hasher.is_simulator_available());
        let a = hasher.hash("quantum-ish").unwrap();
        let b = hasher.hash("quantum-ish").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            hasher.distribution("quantum-ish").unwrap().values().sum::<u64>(),
            256
        );
    }
}
