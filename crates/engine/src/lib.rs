//! # SVDB Engine
//!
//! The database facade. Content flows through an [`Embedder`], each chunk is
//! fingerprinted into a pointer, and the (embedding, pointer) pairs are
//! stored durably and indexed into content-hash buckets.
//!
//! ## Architecture
//!
//! ```text
//! content
//!     │
//!     ├──> Embedder ──────────────> embeddings ─┐
//!     │                                         ├──> VectorStore (durable)
//!     └──> FingerprintHasher ─────> pointers ───┤
//!                                               └──> BucketIndex (in memory)
//!
//! query ──> SearchMode ──> exact | amplified | bucket | pointers
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use svdb_engine::{Database, SearchMode};
//! use svdb_protocol::SvdbConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Database::open("./svdb-data", SvdbConfig::default()).await?;
//!     let id = db.store_content("tiny pointers into a hashed index").await?;
//!
//!     for hit in db.search_content("tiny pointers", 5, SearchMode::Exact).await? {
//!         println!("{}: {:.3}", hit.item_id, hit.score);
//!     }
//!     db.delete(&id).await?;
//!     Ok(())
//! }
//! ```

mod database;
mod embedder;
mod error;
mod monitor;

pub use database::{Database, DatabaseStats, SearchMode, EVENTS_FILE, VECTORS_FILE};
pub use embedder::{EmbeddedChunk, Embedder, StubEmbedder, DEFAULT_STUB_DIMENSION};
pub use error::{EngineError, Result};
pub use monitor::{PerformanceMonitor, PerformanceSnapshot};
