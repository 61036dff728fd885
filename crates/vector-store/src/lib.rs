//! # SVDB Vector Store
//!
//! Durable per-item storage of embedding vectors and their fingerprint
//! pointers, with exhaustive cosine search as the ranking ground truth.
//!
//! ## Features
//!
//! - **Upsert semantics** keyed by item id (UUID v4 when none is given)
//! - **Exact search**: each item scores its best embedding
//! - **Blended search** over (embedding, pointer) pairs
//! - **Durable writes**: JSON snapshot written via temp file, `fsync`, rename
//!
//! ## Architecture
//!
//! ```text
//! store(embeddings, pointers, id?)
//!     │
//!     ├──> validate (pair count, dimensions)
//!     ├──> in-memory records (insertion order)
//!     └──> snapshot.json
//!            └─> base64(SVB1 | count | dim | f32 LE ...)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use svdb_vector_store::VectorStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = VectorStore::open("vectors.json").await?;
//!     let id = store
//!         .store(vec![vec![1.0, 0.0]], vec![vec![0.6, 0.8]], None)
//!         .await?;
//!
//!     for hit in store.search(&[1.0, 0.0], 5).await? {
//!         println!("{}: {:.3}", hit.item_id, hit.score);
//!     }
//!     store.delete(&id).await?;
//!     Ok(())
//! }
//! ```

mod blob;
mod error;
mod store;
mod types;

pub use error::{Result, VectorStoreError};
pub use store::VectorStore;
pub use types::{VectorRecord, VECTOR_STORE_SCHEMA_VERSION};
