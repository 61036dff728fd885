use crate::capability::BackendPreference;
use crate::error::{ConfigError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_POINTER_DIMENSION: usize = 32;

/// Upper bound on `num_qubits`: the simulator holds `2^num_qubits` amplitudes.
const MAX_QUBITS: usize = 16;

/// Every tunable of the hasher, index and search strategies.
///
/// Nothing here is read from process-wide state; callers pass the value into
/// the components explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SvdbConfig {
    /// Width of the hash space (`2^num_qubits` bit-strings).
    pub num_qubits: usize,
    /// Layers in the parametrized hashing circuit.
    pub depth: usize,
    /// Measurement budget for the sampled distribution.
    pub shots: u32,
    /// Dimension of pointers and of the bucket index.
    pub bucket_dimension: usize,
    pub top_k: usize,
    pub max_buckets: usize,
    /// Weight of pointer similarity in combined search, in `[0, 1]`.
    pub pointer_weight: f32,
    /// Oracle threshold of the amplified strategy.
    pub similarity_threshold: f32,
    pub backend: BackendPreference,
}

impl Default for SvdbConfig {
    fn default() -> Self {
        Self {
            num_qubits: 8,
            depth: 3,
            shots: 1024,
            bucket_dimension: DEFAULT_POINTER_DIMENSION,
            top_k: 5,
            max_buckets: 3,
            pointer_weight: 0.3,
            similarity_threshold: 0.7,
            backend: BackendPreference::Auto,
        }
    }
}

impl SvdbConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_qubits == 0 || self.num_qubits > MAX_QUBITS {
            return Err(invalid(
                "num_qubits",
                format!("must be in 1..={MAX_QUBITS}, got {}", self.num_qubits),
            ));
        }
        if self.shots == 0 {
            return Err(invalid("shots", "must be at least 1".to_string()));
        }
        if self.bucket_dimension == 0 {
            return Err(invalid("bucket_dimension", "must be at least 1".to_string()));
        }
        if self.top_k == 0 {
            return Err(invalid("top_k", "must be at least 1".to_string()));
        }
        if self.max_buckets == 0 {
            return Err(invalid("max_buckets", "must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.pointer_weight) {
            return Err(invalid(
                "pointer_weight",
                format!("must be in [0, 1], got {}", self.pointer_weight),
            ));
        }
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid(
                "similarity_threshold",
                format!("must be in [-1, 1], got {}", self.similarity_threshold),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue { field, reason }
}
