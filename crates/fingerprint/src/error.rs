use thiserror::Error;

pub type Result<T> = std::result::Result<T, FingerprintError>;

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Invalid vector dimension: {0} (must be at least 1)")]
    InvalidDimension(usize),

    #[error("Invalid hasher config: {0}")]
    InvalidConfig(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),
}
