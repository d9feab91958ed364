//! Key-value projection records and process tracking.

use serde::{Deserialize, Serialize};

use crate::Position;

/// A row in a projection table, addressed by `(table, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub table: String,
    pub key: String,
    pub value: serde_json::Value,
}

impl ProjectionRecord {
    pub fn new(table: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            value,
        }
    }

    /// Returns true if the record's JSON value has `field == value`.
    pub fn matches(&self, field: &str, value: &serde_json::Value) -> bool {
        self.value.get(field) == Some(value)
    }
}

/// How a record write treats an existing row with the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail the whole commit with `RecordConflict` if the key exists.
    Insert,
    /// Replace any existing value.
    Upsert,
}

/// A projection write committed together with the events it derives from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordWrite {
    pub record: ProjectionRecord,
    pub mode: WriteMode,
}

impl RecordWrite {
    pub fn insert(table: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            record: ProjectionRecord::new(table, key, value),
            mode: WriteMode::Insert,
        }
    }

    pub fn upsert(table: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            record: ProjectionRecord::new(table, key, value),
            mode: WriteMode::Upsert,
        }
    }
}

/// Last notification position a process has fully handled.
///
/// Stores only ever move a tracking position forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracking {
    pub process: String,
    pub position: Position,
}

impl Tracking {
    pub fn new(process: impl Into<String>, position: Position) -> Self {
        Self {
            process: process.into(),
            position,
        }
    }
}
