//! # SVDB Protocol
//!
//! Types shared by every SVDB crate: the configuration surface, the resolved
//! backend capability, scored search results, audit events and the small set
//! of vector helpers all ranking paths agree on.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

mod capability;
mod config;
mod error;
mod events;
pub mod vector;

pub use capability::{BackendCapability, BackendPreference};
pub use config::{SvdbConfig, DEFAULT_POINTER_DIMENSION};
pub use error::{ConfigError, Result};
pub use events::{
    EventSink, IndexAction, IndexUpdateEvent, JsonlEventLog, MemoryEventLog, OperationEvent,
    OperationStatus,
};

/// One ranked hit: an item id and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredItem {
    pub item_id: String,
    pub score: f32,
}

impl ScoredItem {
    pub fn new(item_id: impl Into<String>, score: f32) -> Self {
        Self {
            item_id: item_id.into(),
            score,
        }
    }
}

/// Seconds since the Unix epoch, as stored in the `timestamp REAL` columns.
#[must_use]
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
