use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(#[from] svdb_protocol::ConfigError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] svdb_fingerprint::FingerprintError),

    #[error("Index error: {0}")]
    Index(#[from] svdb_bucket_index::IndexError),

    #[error("Vector store error: {0}")]
    Store(#[from] svdb_vector_store::VectorStoreError),

    #[error("Search error: {0}")]
    Search(#[from] svdb_search::SearchError),

    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl EngineError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_not_found())
    }
}
