use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IndexError {
    #[error("Invalid pointer dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No pointers supplied for item {0}")]
    NoPointers(String),
}
