use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] svdb_vector_store::VectorStoreError),

    #[error("Bucket index error: {0}")]
    IndexError(#[from] svdb_bucket_index::IndexError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("Bucket search requires a query pointer")]
    MissingPointer,
}
