use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Running,
    Success,
    Failed,
}

/// Audit record for one top-level operation (`store`, `delete`, `search`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperationEvent {
    pub operation_id: String,
    pub operation_type: String,
    pub start_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IndexAction {
    Add,
    Remove,
    Update,
}

/// Audit record for one bucket membership change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IndexUpdateEvent {
    pub item_id: String,
    pub action: IndexAction,
    pub bucket_id: u32,
    pub timestamp: f64,
}

/// Receiver for audit events.
///
/// Sinks must never fail the operation that emitted the event; components
/// work the same with or without one attached.
pub trait EventSink: Send + Sync {
    fn record_operation(&self, event: &OperationEvent);
    fn record_index_update(&self, event: &IndexUpdateEvent);
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    operations: Mutex<Vec<OperationEvent>>,
    index_updates: Mutex<Vec<IndexUpdateEvent>>,
}

impl MemoryEventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<OperationEvent> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn index_updates(&self) -> Vec<IndexUpdateEvent> {
        self.index_updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for MemoryEventLog {
    fn record_operation(&self, event: &OperationEvent) {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn record_index_update(&self, event: &IndexUpdateEvent) {
        self.index_updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LoggedEvent<'a> {
    Operation(&'a OperationEvent),
    IndexUpdate(&'a IndexUpdateEvent),
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlEventLog {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonlEventLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &LoggedEvent<'_>) {
        let _guard = self.write_guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = self.try_append(event) {
            log::warn!("Failed to append audit event to {}: {err}", self.path.display());
        }
    }

    fn try_append(&self, event: &LoggedEvent<'_>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)
    }
}

impl EventSink for JsonlEventLog {
    fn record_operation(&self, event: &OperationEvent) {
        self.append(&LoggedEvent::Operation(event));
    }

    fn record_index_update(&self, event: &IndexUpdateEvent) {
        self.append(&LoggedEvent::IndexUpdate(event));
    }
}
