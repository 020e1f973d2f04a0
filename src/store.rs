//! Record store collaborator contract and the bundled implementations.
//!
//! The core persists flat collections of JSON records and nothing else.
//! There are no transactions: a save replaces the whole collection for one
//! record kind. [`JsonFileStore`] keeps one pretty-printed JSON array per
//! kind under a base directory; [`MemoryStore`] backs tests.
//!
//! Load-side failures degrade instead of erroring: a missing file is an
//! empty collection, and a file that no longer parses is logged and treated
//! as empty. Save-side failures are real errors.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// The record collections the core persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Routes,
    Days,
    Groups,
    Memberships,
    Friendships,
    Observations,
    Posts,
    Comments,
}

impl RecordKind {
    /// File name used by [`JsonFileStore`] for this collection.
    pub fn file_name(&self) -> &'static str {
        match self {
            RecordKind::Routes => "routes.json",
            RecordKind::Days => "days.json",
            RecordKind::Groups => "groups.json",
            RecordKind::Memberships => "memberships.json",
            RecordKind::Friendships => "friendships.json",
            RecordKind::Observations => "observations.json",
            RecordKind::Posts => "posts.json",
            RecordKind::Comments => "comments.json",
        }
    }
}

/// Storage collaborator contract: load or replace one whole collection.
pub trait RecordStore: Send + Sync {
    /// Load every record of a kind. Missing or unreadable data loads as
    /// an empty collection rather than an error.
    fn load_all(&self, kind: RecordKind) -> Result<Vec<Value>>;

    /// Replace every record of a kind.
    fn save_all(&self, kind: RecordKind, records: &[Value]) -> Result<()>;
}

/// Load a collection and decode each row into a typed record.
///
/// Rows that fail to decode are logged and skipped; a store file edited by
/// hand never takes the whole collection down with it.
pub fn load_typed<T: DeserializeOwned>(store: &dyn RecordStore, kind: RecordKind) -> Result<Vec<T>> {
    let rows = store.load_all(kind)?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value(row) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping malformed record in {}: {}", kind.file_name(), e),
        }
    }
    Ok(records)
}

/// Encode typed records and replace the collection.
pub fn save_typed<T: Serialize>(
    store: &dyn RecordStore,
    kind: RecordKind,
    records: &[T],
) -> Result<()> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        rows.push(serde_json::to_value(record)?);
    }
    store.save_all(kind, &rows)
}

// ============================================================================
// JSON file store
// ============================================================================

/// Record store over one pretty-printed JSON array file per record kind.
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `base_dir`. The directory is created on
    /// first save, not here.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory this store reads and writes.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, kind: RecordKind) -> PathBuf {
        self.base_dir.join(kind.file_name())
    }
}

impl RecordStore for JsonFileStore {
    fn load_all(&self, kind: RecordKind) -> Result<Vec<Value>> {
        let path = self.path_for(kind);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&text) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("{} is not a valid record array, loading empty: {}", path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    fn save_all(&self, kind: RecordKind, records: &[Value]) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        let json = serde_json::to_string_pretty(records)?;
        fs::write(self.path_for(kind), json)?;
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Record store backed by a map, for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<RecordKind, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn load_all(&self, kind: RecordKind) -> Result<Vec<Value>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(&kind).cloned().unwrap_or_default())
    }

    fn save_all(&self, kind: RecordKind, records: &[Value]) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        collections.insert(kind, records.to_vec());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
