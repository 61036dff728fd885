//! # SVDB Bucket Index
//!
//! Partitions chunk pointers into buckets keyed by a content hash of the
//! pointer bytes and answers approximate searches by scanning only the
//! buckets whose centroids best match the query.
//!
//! ## Search
//!
//! ```text
//! query pointer
//!   │
//!   ├──> score every bucket centroid (cosine)
//!   ├──> keep the best `max_buckets`
//!   ├──> score each member chunk
//!   └──> merge per item (max over chunks) → top_k
//! ```
//!
//! ## Example
//!
//! ```
//! use svdb_bucket_index::BucketIndex;
//!
//! let index = BucketIndex::new(2);
//! index.add("doc", &[vec![0.6, 0.8], vec![1.0, 0.0]])?;
//! let hits = index.search(&[1.0, 0.0], 5, 3)?;
//! assert_eq!(hits[0].item_id, "doc");
//! # Ok::<(), svdb_bucket_index::IndexError>(())
//! ```

mod bucket;
mod error;
mod index;

pub use bucket::{Bucket, BucketEntry};
pub use error::{IndexError, Result};
pub use index::{bucket_id_for, BucketIndex};
